// 🔍 Deduplication Engine - detect re-imported transactions via dedup hash
// Two strategies: within one batch, and against hashes already stored

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::identity::dedup_hash;
use crate::merchant::normalize_merchant;
use crate::transaction::Transaction;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Same dedup hash as an earlier line of the same batch
    WithinBatch,

    /// Same dedup hash as a transaction stored by an earlier batch
    CrossBatch,
}

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Index of the first occurrence (None for cross-batch matches)
    pub original_index: Option<usize>,

    /// Index of the duplicate
    pub duplicate_index: usize,

    pub dedup_hash: String,

    pub strategy: MatchStrategy,

    /// Human-readable reason
    pub reason: String,
}

/// Dedup hash of a transaction: the pipeline annotation when present,
/// otherwise computed from its fields.
pub fn hash_of(tx: &Transaction) -> String {
    match &tx.dedup_hash {
        Some(hash) => hash.clone(),
        None => {
            let merchant = tx
                .merchant_normalized
                .clone()
                .unwrap_or_else(|| normalize_merchant(&tx.merchant_raw));
            dedup_hash(tx.posted_date, tx.amount_minor, &merchant)
        }
    }
}

/// Find every later line that repeats an earlier line's dedup hash.
pub fn find_duplicates(transactions: &[Transaction]) -> Vec<DuplicateMatch> {
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut matches = Vec::new();

    for (index, tx) in transactions.iter().enumerate() {
        let hash = hash_of(tx);

        if let Some(&original) = first_seen.get(&hash) {
            matches.push(DuplicateMatch {
                original_index: Some(original),
                duplicate_index: index,
                reason: format!(
                    "Repeats line {}: {} | {} | {}",
                    original + 1,
                    tx.posted_date,
                    tx.amount_minor,
                    tx.merchant_raw
                ),
                dedup_hash: hash,
                strategy: MatchStrategy::WithinBatch,
            });
        } else {
            first_seen.insert(hash, index);
        }
    }

    matches
}

/// Split a batch into (new, duplicates) against hashes already stored.
///
/// Repeats inside the batch count as duplicates after their first occurrence.
pub fn partition_new(
    known: &HashSet<String>,
    batch: Vec<Transaction>,
) -> (Vec<Transaction>, Vec<DuplicateMatch>) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut fresh = Vec::new();
    let mut duplicates = Vec::new();

    for (index, tx) in batch.into_iter().enumerate() {
        let hash = hash_of(&tx);

        if known.contains(&hash) {
            duplicates.push(DuplicateMatch {
                original_index: None,
                duplicate_index: index,
                reason: format!(
                    "Already imported: {} | {} | {}",
                    tx.posted_date, tx.amount_minor, tx.merchant_raw
                ),
                dedup_hash: hash,
                strategy: MatchStrategy::CrossBatch,
            });
            continue;
        }

        if let Some(&original) = seen.get(&hash) {
            duplicates.push(DuplicateMatch {
                original_index: Some(original),
                duplicate_index: index,
                reason: format!("Repeats line {} of this batch", original + 1),
                dedup_hash: hash,
                strategy: MatchStrategy::WithinBatch,
            });
            continue;
        }

        seen.insert(hash, index);
        fresh.push(tx);
    }

    (fresh, duplicates)
}

// ============================================================================
// TESTS
// ============================================================================
