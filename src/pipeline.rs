// 📥 Import annotation - attach identity and canonical category to a batch
//
// Runs between the (external) statement parser and the (external)
// persistence layer. Every step here is pure; the only failure mode is a
// boundary field that contains the identity delimiter.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::category::canonicalize;
use crate::identity::TransactionKey;
use crate::merchant::{normalize_merchant, validate_identity_field};
use crate::transaction::Transaction;

/// Who is importing, and which upload this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    user_id: String,
    batch_id: String,
}

impl ImportContext {
    pub fn new(user_id: impl Into<String>, batch_id: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into();
        let batch_id = batch_id.into();

        validate_identity_field("user_id", &user_id)?;
        validate_identity_field("batch_id", &batch_id)?;

        Ok(ImportContext { user_id, batch_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }
}

/// Fill in normalized merchant, canonical category, transaction id and
/// dedup hash. `line_number` is the 1-based position within the batch.
pub fn annotate(ctx: &ImportContext, line_number: u32, mut tx: Transaction) -> Result<Transaction> {
    let merchant = match tx.merchant_normalized.take() {
        Some(existing) => existing,
        None => normalize_merchant(&tx.merchant_raw),
    };

    let key = TransactionKey::new(
        &ctx.user_id,
        &ctx.batch_id,
        tx.posted_date,
        tx.amount_minor,
        &merchant,
        line_number,
    )
    .with_context(|| format!("Invalid identity input on line {}", line_number))?;

    tx.canonical_category = Some(canonicalize(tx.category.as_deref()));
    tx.transaction_id = Some(key.transaction_id());
    tx.dedup_hash = Some(key.dedup_hash());
    tx.merchant_normalized = Some(merchant);

    Ok(tx)
}

/// Annotate a whole batch, numbering lines from 1 in input order.
pub fn annotate_batch(ctx: &ImportContext, transactions: Vec<Transaction>) -> Result<Vec<Transaction>> {
    let mut annotated = Vec::with_capacity(transactions.len());

    for (index, tx) in transactions.into_iter().enumerate() {
        let line_number = u32::try_from(index + 1).context("Batch too large")?;
        let tx = annotate(ctx, line_number, tx)?;
        debug!(
            line = line_number,
            transaction_id = tx.transaction_id.as_deref().unwrap_or_default(),
            "annotated transaction"
        );
        annotated.push(tx);
    }

    info!(
        user_id = %ctx.user_id,
        batch_id = %ctx.batch_id,
        count = annotated.len(),
        "annotated import batch"
    );

    Ok(annotated)
}

// ============================================================================
// TESTS
// ============================================================================
