// 💸 Spend classification - which transactions count toward spend totals
//
// Two independent predicates:
// - include_in_spending: drops credits, zero/negative amounts, own-account
//   transfers and failed/declined attempts. Requires an explicit debit.
// - is_fee_or_interest: flags avoidable charges. A fee can also be spend.

use std::collections::BTreeMap;

use crate::category::{canonicalize, CanonicalCategory};
use crate::transaction::{Transaction, TransactionType};

/// Substrings (lower-case) that mark money moving between the user's own
/// accounts or wallets rather than being spent.
pub const TRANSFER_PATTERNS: &[&str] = &[
    "upi transfer",
    "self transfer",
    "transfer to self",
    "own account",
    "wallet top-up",
    "wallet topup",
    "wallet top up",
    "wallet load",
    "add money",
    "paytm wallet",
    "phonepe wallet",
    "amazon pay balance",
    "mobikwik",
    "freecharge",
    "neft transfer",
    "imps transfer",
    "credit card payment",
];

/// Markers of attempts that never settled.
pub const FAILED_PATTERNS: &[&str] = &["failed", "declined"];

pub const FEE_PATTERNS: &[&str] = &[
    "late fee",
    "annual fee",
    "interest",
    "finance charge",
    "overlimit fee",
    "service charge",
];

fn contains_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

/// Does this transaction count toward total spend?
///
/// An unset or unrecognized `transaction_type` is excluded even when every
/// other check passes: only an explicit debit is spend.
pub fn include_in_spending(tx: &Transaction) -> bool {
    if tx.transaction_type == Some(TransactionType::Credit) {
        return false;
    }

    if tx.amount_minor <= 0 {
        return false;
    }

    let merchant = tx.merchant_text().to_lowercase();

    if contains_any(&merchant, TRANSFER_PATTERNS) {
        return false;
    }

    if contains_any(&merchant, FAILED_PATTERNS) {
        return false;
    }

    tx.transaction_type == Some(TransactionType::Debit)
}

/// Late fees, annual fees, interest and similar avoidable charges.
pub fn is_fee_or_interest(tx: &Transaction) -> bool {
    let merchant = tx.merchant_text().to_lowercase();
    if contains_any(&merchant, FEE_PATTERNS) {
        return true;
    }

    tx.category
        .as_deref()
        .map(|c| contains_any(&c.to_lowercase(), FEE_PATTERNS))
        .unwrap_or(false)
}

// ============================================================================
// AGGREGATES
// ============================================================================

pub fn calculate_total_spending(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .filter(|tx| include_in_spending(tx))
        .map(|tx| tx.amount_minor)
        .sum()
}

/// Spend fees only: fee-flagged transactions that also count as spend.
pub fn calculate_fee_total(transactions: &[Transaction]) -> i64 {
    transactions
        .iter()
        .filter(|tx| include_in_spending(tx) && is_fee_or_interest(tx))
        .map(|tx| tx.amount_minor)
        .sum()
}

/// Spend bucketed by the raw `category` text; missing category is "Other".
pub fn group_by_category(transactions: &[Transaction]) -> BTreeMap<String, i64> {
    let mut groups = BTreeMap::new();

    for tx in transactions.iter().filter(|tx| include_in_spending(tx)) {
        let key = tx
            .category
            .clone()
            .unwrap_or_else(|| CanonicalCategory::Other.as_str().to_string());
        *groups.entry(key).or_insert(0) += tx.amount_minor;
    }

    groups
}

/// Spend bucketed by canonical category. Uses the pipeline annotation when
/// present, otherwise canonicalizes the raw category.
pub fn group_by_canonical_category(transactions: &[Transaction]) -> BTreeMap<CanonicalCategory, i64> {
    let mut groups = BTreeMap::new();

    for tx in transactions.iter().filter(|tx| include_in_spending(tx)) {
        let key = tx
            .canonical_category
            .unwrap_or_else(|| canonicalize(tx.category.as_deref()));
        *groups.entry(key).or_insert(0) += tx.amount_minor;
    }

    groups
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_test_transaction(amount: i64, merchant: &str, tx_type: Option<&str>) -> Transaction {
        let mut tx = Transaction::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), amount, merchant);
        tx.transaction_type = tx_type.map(TransactionType::from);
        tx
    }

    #[test]
    fn test_credit_is_not_spend() {
        let tx = create_test_transaction(500, "Refund", Some("credit"));
        assert!(!include_in_spending(&tx));
    }

    #[test]
    fn test_debit_is_spend() {
        let tx = create_test_transaction(500, "Amazon", Some("debit"));
        assert!(include_in_spending(&tx));
    }

    #[test]
    fn test_zero_and_negative_amounts_are_not_spend() {
        assert!(!include_in_spending(&create_test_transaction(0, "Amazon", Some("debit"))));
        assert!(!include_in_spending(&create_test_transaction(-250, "Amazon", Some("debit"))));
    }

    #[test]
    fn test_transfers_are_not_spend() {
        let tx = create_test_transaction(200, "UPI Transfer to self", Some("debit"));
        assert!(!include_in_spending(&tx));

        let tx = create_test_transaction(1000, "PAYTM WALLET top up", Some("debit"));
        assert!(!include_in_spending(&tx));
    }

    #[test]
    fn test_failed_and_declined_are_not_spend() {
        assert!(!include_in_spending(&create_test_transaction(300, "Flipkart FAILED", Some("debit"))));
        assert!(!include_in_spending(&create_test_transaction(300, "declined - zomato", Some("debit"))));
    }

    #[test]
    fn test_requires_explicit_debit() {
        assert!(!include_in_spending(&create_test_transaction(500, "Amazon", None)));
        assert!(!include_in_spending(&create_test_transaction(500, "Amazon", Some("pending"))));
    }

    #[test]
    fn test_fee_detection_uses_merchant_and_category() {
        let tx = create_test_transaction(75000, "HDFC LATE FEE", Some("debit"));
        assert!(is_fee_or_interest(&tx));
        assert!(include_in_spending(&tx));

        let tx = create_test_transaction(1200, "HDFC Card", Some("debit")).with_category("Finance Charge");
        assert!(is_fee_or_interest(&tx));

        let tx = create_test_transaction(1200, "Amazon", Some("debit")).with_category("shopping");
        assert!(!is_fee_or_interest(&tx));
    }

    #[test]
    fn test_total_spending_sums_only_included() {
        let txs = vec![
            create_test_transaction(500, "Amazon", Some("debit")),
            create_test_transaction(120000, "Salary", Some("credit")),
            create_test_transaction(200, "UPI Transfer to self", Some("debit")),
            create_test_transaction(300, "Swiggy", Some("debit")),
            create_test_transaction(0, "Swiggy", Some("debit")),
            create_test_transaction(700, "Uber", None),
        ];

        let expected: i64 = txs
            .iter()
            .filter(|tx| include_in_spending(tx))
            .map(|tx| tx.amount_minor)
            .sum();

        assert_eq!(calculate_total_spending(&txs), 800);
        assert_eq!(calculate_total_spending(&txs), expected);
    }

    #[test]
    fn test_fee_total() {
        let txs = vec![
            create_test_transaction(500, "Annual Fee", Some("debit")),
            create_test_transaction(900, "Interest charged", Some("credit")),
            create_test_transaction(300, "Swiggy", Some("debit")),
        ];
        assert_eq!(calculate_fee_total(&txs), 500);
    }

    #[test]
    fn test_group_by_category_uses_raw_text() {
        let txs = vec![
            create_test_transaction(500, "Amazon", Some("debit")).with_category("shopping"),
            create_test_transaction(250, "Myntra", Some("debit")).with_category("Shopping"),
            create_test_transaction(300, "Swiggy", Some("debit")),
            create_test_transaction(999, "Salary", Some("credit")).with_category("shopping"),
        ];

        let groups = group_by_category(&txs);
        assert_eq!(groups.get("shopping"), Some(&500));
        assert_eq!(groups.get("Shopping"), Some(&250));
        assert_eq!(groups.get("Other"), Some(&300));
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_group_by_canonical_category_merges_synonyms() {
        let txs = vec![
            create_test_transaction(500, "Amazon", Some("debit")).with_category("shopping"),
            create_test_transaction(250, "Myntra", Some("debit")).with_category("Shopping"),
            create_test_transaction(300, "Swiggy", Some("debit")).with_category("food"),
        ];

        let groups = group_by_canonical_category(&txs);
        assert_eq!(groups.get(&CanonicalCategory::ShoppingAndEcommerce), Some(&750));
        assert_eq!(groups.get(&CanonicalCategory::FoodAndDining), Some(&300));
    }
}
