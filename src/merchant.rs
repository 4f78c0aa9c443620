// 🏪 Merchant normalization - boundary sanitation for identity inputs
//
// "AMAZON   Pay|India" and "amazon pay india" are the same merchant.
// Normalized text is what the identity generator hashes, so it must never
// contain the composite delimiter.

use anyhow::{bail, Result};

use crate::identity::DELIMITER;

/// Lower-case, strip delimiter/control characters, collapse whitespace.
pub fn normalize_merchant(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c == DELIMITER || c.is_control() { ' ' } else { c })
        .collect();

    cleaned
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reject a field that would corrupt the identity composite.
pub fn validate_identity_field(name: &str, value: &str) -> Result<()> {
    if value.contains(DELIMITER) {
        bail!("{} contains reserved delimiter {:?}: {:?}", name, DELIMITER, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_merchant_string() {
        assert_eq!(normalize_merchant("  AMAZON   Pay  "), "amazon pay");
        assert_eq!(normalize_merchant("Swiggy|Bangalore"), "swiggy bangalore");
        assert_eq!(normalize_merchant("UBER\tTRIP\n"), "uber trip");
        assert_eq!(normalize_merchant(""), "");
    }

    #[test]
    fn test_normalized_merchant_never_contains_delimiter() {
        let normalized = normalize_merchant("a|b||c");
        assert!(!normalized.contains(DELIMITER));
        assert!(validate_identity_field("merchant", &normalized).is_ok());
    }

    #[test]
    fn test_validate_identity_field_rejects_delimiter() {
        let err = validate_identity_field("batch_id", "batch|7").unwrap_err();
        assert!(err.to_string().contains("batch_id"));
    }
}
