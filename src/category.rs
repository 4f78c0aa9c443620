// 🏷️ Canonical categories - closed taxonomy used for aggregation
//
// Free-form category text from statements ("food", "Food and Dining",
// "FOOD_AND_DINING", "groceries") collapses onto one of nine labels.
// Rules as data: the synonym table below is the only place a mapping lives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CANONICAL CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalCategory {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    #[serde(rename = "Shopping & E-commerce")]
    ShoppingAndEcommerce,
    #[serde(rename = "Travel & Transport")]
    TravelAndTransport,
    #[serde(rename = "Bills & Utilities")]
    BillsAndUtilities,
    #[serde(rename = "Entertainment & Subscriptions")]
    EntertainmentAndSubscriptions,
    #[serde(rename = "Health & Wellness")]
    HealthAndWellness,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Investments & Savings")]
    InvestmentsAndSavings,
    #[serde(rename = "Other")]
    Other,
}

impl CanonicalCategory {
    pub const ALL: [CanonicalCategory; 9] = [
        CanonicalCategory::FoodAndDining,
        CanonicalCategory::ShoppingAndEcommerce,
        CanonicalCategory::TravelAndTransport,
        CanonicalCategory::BillsAndUtilities,
        CanonicalCategory::EntertainmentAndSubscriptions,
        CanonicalCategory::HealthAndWellness,
        CanonicalCategory::Education,
        CanonicalCategory::InvestmentsAndSavings,
        CanonicalCategory::Other,
    ];

    /// Display label, exactly as stored alongside transactions
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalCategory::FoodAndDining => "Food & Dining",
            CanonicalCategory::ShoppingAndEcommerce => "Shopping & E-commerce",
            CanonicalCategory::TravelAndTransport => "Travel & Transport",
            CanonicalCategory::BillsAndUtilities => "Bills & Utilities",
            CanonicalCategory::EntertainmentAndSubscriptions => "Entertainment & Subscriptions",
            CanonicalCategory::HealthAndWellness => "Health & Wellness",
            CanonicalCategory::Education => "Education",
            CanonicalCategory::InvestmentsAndSavings => "Investments & Savings",
            CanonicalCategory::Other => "Other",
        }
    }
}

impl fmt::Display for CanonicalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only the nine labels, verbatim. Use `normalize_category`
/// for free text.
impl FromStr for CanonicalCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Not a canonical category: {:?}", s))
    }
}

// ============================================================================
// SYNONYM TABLE
// ============================================================================

use CanonicalCategory::*;

/// Lower-cased, trimmed synonyms. Lookup is exact against the left column.
pub const CATEGORY_SYNONYMS: &[(&str, CanonicalCategory)] = &[
    // Food & Dining
    ("food & dining", FoodAndDining),
    ("food and dining", FoodAndDining),
    ("food_and_dining", FoodAndDining),
    ("food_dining", FoodAndDining),
    ("food", FoodAndDining),
    ("foods", FoodAndDining),
    ("dining", FoodAndDining),
    ("restaurant", FoodAndDining),
    ("restaurants", FoodAndDining),
    ("grocery", FoodAndDining),
    ("groceries", FoodAndDining),
    ("food delivery", FoodAndDining),
    ("food_delivery", FoodAndDining),
    ("cafe", FoodAndDining),
    ("cafes", FoodAndDining),
    ("f&b", FoodAndDining),
    // Shopping & E-commerce
    ("shopping & e-commerce", ShoppingAndEcommerce),
    ("shopping and e-commerce", ShoppingAndEcommerce),
    ("shopping & ecommerce", ShoppingAndEcommerce),
    ("shopping and ecommerce", ShoppingAndEcommerce),
    ("shopping_and_ecommerce", ShoppingAndEcommerce),
    ("shopping_ecommerce", ShoppingAndEcommerce),
    ("shopping & e commerce", ShoppingAndEcommerce),
    ("shopping and e commerce", ShoppingAndEcommerce),
    ("shopping_and_e_commerce", ShoppingAndEcommerce),
    ("shopping_e_commerce", ShoppingAndEcommerce),
    ("shopping", ShoppingAndEcommerce),
    ("e-commerce", ShoppingAndEcommerce),
    ("ecommerce", ShoppingAndEcommerce),
    ("e commerce", ShoppingAndEcommerce),
    ("e_commerce", ShoppingAndEcommerce),
    ("online shopping", ShoppingAndEcommerce),
    ("online_shopping", ShoppingAndEcommerce),
    ("retail", ShoppingAndEcommerce),
    ("apparel", ShoppingAndEcommerce),
    ("clothing", ShoppingAndEcommerce),
    ("electronics", ShoppingAndEcommerce),
    // Travel & Transport
    ("travel & transport", TravelAndTransport),
    ("travel and transport", TravelAndTransport),
    ("travel & transportation", TravelAndTransport),
    ("travel and transportation", TravelAndTransport),
    ("travel_and_transport", TravelAndTransport),
    ("travel_transport", TravelAndTransport),
    ("travel", TravelAndTransport),
    ("transport", TravelAndTransport),
    ("transportation", TravelAndTransport),
    ("fuel", TravelAndTransport),
    ("gas & fuel", TravelAndTransport),
    ("cab", TravelAndTransport),
    ("cabs", TravelAndTransport),
    ("taxi", TravelAndTransport),
    ("flights", TravelAndTransport),
    ("flight", TravelAndTransport),
    ("hotel", TravelAndTransport),
    ("hotels", TravelAndTransport),
    // Bills & Utilities
    ("bills & utilities", BillsAndUtilities),
    ("bills and utilities", BillsAndUtilities),
    ("bills_and_utilities", BillsAndUtilities),
    ("bills_utilities", BillsAndUtilities),
    ("bill", BillsAndUtilities),
    ("bills", BillsAndUtilities),
    ("utility", BillsAndUtilities),
    ("utilities", BillsAndUtilities),
    ("rent", BillsAndUtilities),
    ("electricity", BillsAndUtilities),
    ("internet", BillsAndUtilities),
    ("mobile recharge", BillsAndUtilities),
    ("recharge", BillsAndUtilities),
    ("insurance", BillsAndUtilities),
    // Entertainment & Subscriptions
    ("entertainment & subscriptions", EntertainmentAndSubscriptions),
    ("entertainment and subscriptions", EntertainmentAndSubscriptions),
    ("entertainment_and_subscriptions", EntertainmentAndSubscriptions),
    ("entertainment_subscriptions", EntertainmentAndSubscriptions),
    ("entertainment", EntertainmentAndSubscriptions),
    ("subscription", EntertainmentAndSubscriptions),
    ("subscriptions", EntertainmentAndSubscriptions),
    ("streaming", EntertainmentAndSubscriptions),
    ("movies", EntertainmentAndSubscriptions),
    ("movie", EntertainmentAndSubscriptions),
    ("gaming", EntertainmentAndSubscriptions),
    ("ott", EntertainmentAndSubscriptions),
    // Health & Wellness
    ("health & wellness", HealthAndWellness),
    ("health and wellness", HealthAndWellness),
    ("health_and_wellness", HealthAndWellness),
    ("health_wellness", HealthAndWellness),
    ("health", HealthAndWellness),
    ("healthcare", HealthAndWellness),
    ("wellness", HealthAndWellness),
    ("medical", HealthAndWellness),
    ("pharmacy", HealthAndWellness),
    ("fitness", HealthAndWellness),
    ("gym", HealthAndWellness),
    // Education
    ("education", Education),
    ("educational", Education),
    ("edu", Education),
    ("tuition", Education),
    ("books", Education),
    ("courses", Education),
    ("course", Education),
    // Investments & Savings
    ("investments & savings", InvestmentsAndSavings),
    ("investments and savings", InvestmentsAndSavings),
    ("investment & savings", InvestmentsAndSavings),
    ("investment and savings", InvestmentsAndSavings),
    ("investments_and_savings", InvestmentsAndSavings),
    ("investments_savings", InvestmentsAndSavings),
    ("investment", InvestmentsAndSavings),
    ("investments", InvestmentsAndSavings),
    ("savings", InvestmentsAndSavings),
    ("saving", InvestmentsAndSavings),
    ("mutual fund", InvestmentsAndSavings),
    ("mutual funds", InvestmentsAndSavings),
    ("sip", InvestmentsAndSavings),
    ("stocks", InvestmentsAndSavings),
    // Other
    ("other", Other),
    ("others", Other),
    ("misc", Other),
    ("miscellaneous", Other),
    ("uncategorized", Other),
];

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Map any category text onto the closed taxonomy. Never fails: empty,
/// missing and unknown input all land on `Other`.
pub fn normalize_category(input: Option<&str>) -> CanonicalCategory {
    let key = match input {
        Some(s) => s.trim().to_lowercase(),
        None => return Other,
    };

    if key.is_empty() {
        return Other;
    }

    CATEGORY_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, category)| *category)
        .unwrap_or(Other)
}

/// True only for one of the nine labels, verbatim (case-sensitive).
pub fn is_standard_category(s: &str) -> bool {
    CanonicalCategory::ALL.iter().any(|c| c.as_str() == s)
}

/// Short-circuits re-normalization for labels that are already canonical.
pub fn canonicalize(input: Option<&str>) -> CanonicalCategory {
    match input {
        Some(s) if is_standard_category(s) => s.parse().unwrap_or(Other),
        other => normalize_category(other),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_synonyms_collapse_to_same_label() {
        let variants = ["food", "Food and Dining", "FOOD_AND_DINING", "  food & dining  ", "Groceries"];
        for v in variants {
            assert_eq!(normalize_category(Some(v)), FoodAndDining, "variant {:?}", v);
        }
    }

    #[test]
    fn test_joined_forms_of_every_label() {
        for category in CanonicalCategory::ALL {
            let label = category.as_str().to_lowercase();
            let with_and = label.replace('&', "and");
            let underscored = with_and.replace([' ', '-'], "_");
            let short = label.replace(" & ", "_").replace('-', "_");
            let unhyphenated = with_and.replace('-', " ");

            for form in [label, with_and, underscored, short, unhyphenated] {
                assert_eq!(normalize_category(Some(&form)), category, "form {:?}", form);
                assert_eq!(
                    normalize_category(Some(&form.to_uppercase())),
                    category,
                    "form {:?}",
                    form.to_uppercase()
                );
            }
        }
    }

    #[test]
    fn test_unknown_and_empty_map_to_other() {
        assert_eq!(normalize_category(None), Other);
        assert_eq!(normalize_category(Some("")), Other);
        assert_eq!(normalize_category(Some("   ")), Other);
        assert_eq!(normalize_category(Some("totally-unknown-xyz")), Other);
    }

    #[test]
    fn test_every_label_normalizes_to_itself() {
        for category in CanonicalCategory::ALL {
            assert_eq!(normalize_category(Some(category.as_str())), category);
        }
    }

    #[test]
    fn test_synonym_table_has_no_conflicts() {
        let mut seen = HashSet::new();
        for (synonym, _) in CATEGORY_SYNONYMS {
            assert_eq!(*synonym, synonym.trim().to_lowercase(), "table keys must be normalized");
            assert!(seen.insert(*synonym), "duplicate synonym {:?}", synonym);
        }
    }

    #[test]
    fn test_is_standard_category_is_verbatim() {
        assert!(is_standard_category("Food & Dining"));
        assert!(is_standard_category("Other"));
        assert!(!is_standard_category("food & dining"));
        assert!(!is_standard_category("Food and Dining"));
        assert!(!is_standard_category(""));
    }

    #[test]
    fn test_from_str_is_strict() {
        assert_eq!("Education".parse::<CanonicalCategory>().unwrap(), Education);
        assert!("education".parse::<CanonicalCategory>().is_err());
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&ShoppingAndEcommerce).unwrap();
        assert_eq!(json, "\"Shopping & E-commerce\"");

        let parsed: CanonicalCategory = serde_json::from_str("\"Bills & Utilities\"").unwrap();
        assert_eq!(parsed, BillsAndUtilities);
    }

    #[test]
    fn test_canonicalize_short_circuits_labels() {
        assert_eq!(canonicalize(Some("Travel & Transport")), TravelAndTransport);
        assert_eq!(canonicalize(Some("cab")), TravelAndTransport);
        assert_eq!(canonicalize(None), Other);
    }
}
