// 🔑 Transaction identity - content-addressed IDs and dedup hashes
//
// Two hashes per transaction:
// - transaction_id: scoped to (user, batch, date, amount, merchant, line).
//   Re-importing the same statement line yields the same id.
// - dedup_hash: scoped to (date, amount, merchant) only, so the same
//   real-world transaction in two overlapping batches collides on purpose.
//
// Precondition: no field contains DELIMITER. The functions here do not check;
// use TransactionKey::new (or merchant::validate_identity_field) at the
// boundary.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::merchant::validate_identity_field;

pub const DELIMITER: char = '|';
pub const TRANSACTION_ID_PREFIX: &str = "txn_";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn sha256_hex(composite: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(composite.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn composite(fields: &[&str]) -> String {
    let delimiter = DELIMITER.to_string();
    fields.join(delimiter.as_str())
}

/// Deterministic id for one statement line of one import batch.
pub fn transaction_id(
    user_id: &str,
    batch_id: &str,
    posted_date: NaiveDate,
    amount_minor: i64,
    normalized_merchant: &str,
    line_number: u32,
) -> String {
    let date = posted_date.format(DATE_FORMAT).to_string();
    let amount = amount_minor.to_string();
    let line = line_number.to_string();

    let key = composite(&[user_id, batch_id, &date, &amount, normalized_merchant, &line]);
    format!("{}{}", TRANSACTION_ID_PREFIX, sha256_hex(&key))
}

/// Batch-independent hash used to recognize cross-batch duplicates.
pub fn dedup_hash(posted_date: NaiveDate, amount_minor: i64, normalized_merchant: &str) -> String {
    let date = posted_date.format(DATE_FORMAT).to_string();
    let amount = amount_minor.to_string();

    sha256_hex(&composite(&[&date, &amount, normalized_merchant]))
}

// ============================================================================
// TRANSACTION KEY (validated inputs)
// ============================================================================

/// Identity inputs that have passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionKey {
    user_id: String,
    batch_id: String,
    posted_date: NaiveDate,
    amount_minor: i64,
    normalized_merchant: String,
    line_number: u32,
}

impl TransactionKey {
    pub fn new(
        user_id: &str,
        batch_id: &str,
        posted_date: NaiveDate,
        amount_minor: i64,
        normalized_merchant: &str,
        line_number: u32,
    ) -> Result<Self> {
        validate_identity_field("user_id", user_id)?;
        validate_identity_field("batch_id", batch_id)?;
        validate_identity_field("normalized_merchant", normalized_merchant)?;

        Ok(TransactionKey {
            user_id: user_id.to_string(),
            batch_id: batch_id.to_string(),
            posted_date,
            amount_minor,
            normalized_merchant: normalized_merchant.to_string(),
            line_number,
        })
    }

    pub fn transaction_id(&self) -> String {
        transaction_id(
            &self.user_id,
            &self.batch_id,
            self.posted_date,
            self.amount_minor,
            &self.normalized_merchant,
            self.line_number,
        )
    }

    pub fn dedup_hash(&self) -> String {
        dedup_hash(self.posted_date, self.amount_minor, &self.normalized_merchant)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn base_id() -> String {
        transaction_id("user-1", "batch-1", date("2024-03-01"), 45000, "swiggy", 3)
    }

    #[test]
    fn test_transaction_id_is_deterministic() {
        assert_eq!(base_id(), base_id());
    }

    #[test]
    fn test_transaction_id_format() {
        let id = base_id();
        assert!(id.starts_with("txn_"));

        let hex = &id[TRANSACTION_ID_PREFIX.len()..];
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_transaction_id_known_vector() {
        // sha256("u|b|2024-01-02|100|m|1")
        let expected = sha256_hex("u|b|2024-01-02|100|m|1");
        assert_eq!(
            transaction_id("u", "b", date("2024-01-02"), 100, "m", 1),
            format!("txn_{}", expected)
        );
    }

    #[test]
    fn test_changing_any_field_changes_transaction_id() {
        let d = date("2024-03-01");
        let variants = vec![
            base_id(),
            transaction_id("user-2", "batch-1", d, 45000, "swiggy", 3),
            transaction_id("user-1", "batch-2", d, 45000, "swiggy", 3),
            transaction_id("user-1", "batch-1", date("2024-03-02"), 45000, "swiggy", 3),
            transaction_id("user-1", "batch-1", d, 45001, "swiggy", 3),
            transaction_id("user-1", "batch-1", d, 45000, "zomato", 3),
            transaction_id("user-1", "batch-1", d, 45000, "swiggy", 4),
        ];

        let unique: HashSet<_> = variants.iter().collect();
        assert_eq!(unique.len(), variants.len());
    }

    #[test]
    fn test_dedup_hash_ignores_batch_scope() {
        let d = date("2024-03-01");
        let a = TransactionKey::new("user-1", "batch-1", d, 45000, "swiggy", 3).unwrap();
        let b = TransactionKey::new("user-9", "batch-7", d, 45000, "swiggy", 12).unwrap();

        assert_eq!(a.dedup_hash(), b.dedup_hash());
        assert_ne!(a.transaction_id(), b.transaction_id());
    }

    #[test]
    fn test_dedup_hash_sensitive_to_content() {
        let d = date("2024-03-01");
        let hashes = vec![
            dedup_hash(d, 45000, "swiggy"),
            dedup_hash(date("2024-03-02"), 45000, "swiggy"),
            dedup_hash(d, 45001, "swiggy"),
            dedup_hash(d, -45000, "swiggy"),
            dedup_hash(d, 45000, "zomato"),
        ];

        let unique: HashSet<_> = hashes.iter().collect();
        assert_eq!(unique.len(), hashes.len());
        assert!(hashes.iter().all(|h| h.len() == 64 && !h.starts_with("txn_")));
    }

    #[test]
    fn test_transaction_key_rejects_delimiter() {
        let d = date("2024-03-01");
        assert!(TransactionKey::new("user|1", "batch-1", d, 1, "m", 1).is_err());
        assert!(TransactionKey::new("user-1", "batch|1", d, 1, "m", 1).is_err());
        assert!(TransactionKey::new("user-1", "batch-1", d, 1, "a|b", 1).is_err());
    }

    #[test]
    fn test_transaction_key_matches_free_functions() {
        let d = date("2024-03-01");
        let key = TransactionKey::new("user-1", "batch-1", d, 45000, "swiggy", 3).unwrap();
        assert_eq!(key.transaction_id(), base_id());
        assert_eq!(key.dedup_hash(), dedup_hash(d, 45000, "swiggy"));
    }
}
