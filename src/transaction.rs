// 🧾 Transaction record - the shape every import hands to the pipeline
// Core fields come from the (external) statement parser, annotations are
// filled in by the pipeline before the record is persisted.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::category::CanonicalCategory;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// Direction marker supplied by the parser.
///
/// Anything that is not `debit` or `credit` is kept verbatim in `Other` so the
/// spend classifier can treat it as "not an explicit debit".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Debit,
    Credit,
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
            TransactionType::Other(s) => s,
        }
    }
}

impl From<&str> for TransactionType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "debit" => TransactionType::Debit,
            "credit" => TransactionType::Credit,
            _ => TransactionType::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        TransactionType::from(s.as_str())
    }
}

impl From<TransactionType> for String {
    fn from(t: TransactionType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    // ========================================================================
    // CORE FIELDS (produced by the import/parse step)
    // ========================================================================
    pub posted_date: NaiveDate,

    /// Amount in the smallest currency unit (cents, paise, ...)
    pub amount_minor: i64,

    pub merchant_raw: String,

    /// Derived from `merchant_raw` by `merchant::normalize_merchant`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_normalized: Option<String>,

    /// Free text from the source, or already a canonical label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,

    // ========================================================================
    // ANNOTATIONS (filled in by pipeline::annotate)
    // ========================================================================
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_category: Option<CanonicalCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_hash: Option<String>,
}

impl Transaction {
    pub fn new(posted_date: NaiveDate, amount_minor: i64, merchant_raw: impl Into<String>) -> Self {
        Transaction {
            posted_date,
            amount_minor,
            merchant_raw: merchant_raw.into(),
            merchant_normalized: None,
            category: None,
            transaction_type: None,
            canonical_category: None,
            transaction_id: None,
            dedup_hash: None,
        }
    }

    /// Builder pattern: set the direction marker
    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Builder pattern: set the source category text
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Merchant text used by the classifier: normalized when available.
    pub fn merchant_text(&self) -> &str {
        self.merchant_normalized
            .as_deref()
            .unwrap_or(&self.merchant_raw)
    }

    pub fn is_annotated(&self) -> bool {
        self.transaction_id.is_some() && self.dedup_hash.is_some()
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

/// Row layout of an already-parsed transaction export.
#[derive(Debug, Deserialize)]
struct CsvRow {
    posted_date: NaiveDate,
    amount_minor: i64,
    merchant: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    transaction_type: Option<String>,
}

impl From<CsvRow> for Transaction {
    fn from(row: CsvRow) -> Self {
        let mut tx = Transaction::new(row.posted_date, row.amount_minor, row.merchant);
        tx.category = row.category.filter(|c| !c.trim().is_empty());
        tx.transaction_type = row
            .transaction_type
            .filter(|t| !t.trim().is_empty())
            .map(TransactionType::from);
        tx
    }
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<Transaction>> {
    let rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;
    read_csv(rdr)
}

fn read_csv<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Vec<Transaction>> {
    let mut transactions = Vec::new();

    for (index, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let row = result.with_context(|| format!("Failed to deserialize line {}", index + 2))?;
        transactions.push(row.into());
    }

    Ok(transactions)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!(TransactionType::from("DEBIT"), TransactionType::Debit);
        assert_eq!(TransactionType::from(" credit "), TransactionType::Credit);
        assert_eq!(
            TransactionType::from("refund"),
            TransactionType::Other("refund".to_string())
        );
    }

    #[test]
    fn test_transaction_type_serializes_as_string() {
        let json = serde_json::to_string(&TransactionType::Debit).unwrap();
        assert_eq!(json, "\"debit\"");

        let parsed: TransactionType = serde_json::from_str("\"reversal\"").unwrap();
        assert_eq!(parsed, TransactionType::Other("reversal".to_string()));
    }

    #[test]
    fn test_merchant_text_prefers_normalized() {
        let mut tx = Transaction::new(date("2024-03-01"), 1500, "AMAZON  Pay");
        assert_eq!(tx.merchant_text(), "AMAZON  Pay");

        tx.merchant_normalized = Some("amazon pay".to_string());
        assert_eq!(tx.merchant_text(), "amazon pay");
    }

    #[test]
    fn test_read_csv() {
        let data = "\
posted_date,amount_minor,merchant,category,transaction_type
2024-03-01,45000,Swiggy,food,debit
2024-03-02,120000,Salary,,credit
2024-03-03,999,Netflix,,
";
        let rdr = csv::Reader::from_reader(data.as_bytes());
        let txs = read_csv(rdr).unwrap();

        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].posted_date, date("2024-03-01"));
        assert_eq!(txs[0].amount_minor, 45000);
        assert_eq!(txs[0].category.as_deref(), Some("food"));
        assert_eq!(txs[0].transaction_type, Some(TransactionType::Debit));
        assert_eq!(txs[1].category, None);
        assert_eq!(txs[1].transaction_type, Some(TransactionType::Credit));
        assert_eq!(txs[2].transaction_type, None);
    }

    #[test]
    fn test_read_csv_reports_bad_line() {
        let data = "\
posted_date,amount_minor,merchant,category,transaction_type
2024-03-01,not-a-number,Swiggy,food,debit
";
        let rdr = csv::Reader::from_reader(data.as_bytes());
        let err = read_csv(rdr).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
