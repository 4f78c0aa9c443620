// Ledger Sync - Core Library
// Transaction identity, category normalization, spend classification and
// the durable action queue. Used by the CLI and integration tests.

pub mod category;
pub mod config;
pub mod deduplication;
pub mod identity;
pub mod logging;
pub mod merchant;
pub mod pipeline;
pub mod queue;
pub mod spending;
pub mod transaction;

// Re-export commonly used types
pub use category::{
    canonicalize, is_standard_category, normalize_category, CanonicalCategory, CATEGORY_SYNONYMS,
};
pub use config::{AppConfig, QueueConfig};
pub use deduplication::{find_duplicates, partition_new, DuplicateMatch, MatchStrategy};
pub use identity::{dedup_hash, transaction_id, TransactionKey};
pub use merchant::{normalize_merchant, validate_identity_field};
pub use pipeline::{annotate, annotate_batch, ImportContext};
pub use queue::{
    Action, ActionHandler, ActionQueue, DrainOutcome, KeyValueStore, MemoryStore, NoteUpdate,
    QueuedAction, ReminderDismiss, ShortlistAdd, SlotUpdate, SqliteStore, StatusUpdate,
};
pub use spending::{
    calculate_fee_total, calculate_total_spending, group_by_canonical_category, group_by_category,
    include_in_spending, is_fee_or_interest,
};
pub use transaction::{load_csv, Transaction, TransactionType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
