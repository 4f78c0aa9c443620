// Queued actions and their persisted record format.
//
// On disk each action is `{id, type, payload, timestamp, retryCount}`. Records
// whose type or payload no longer decode are kept as `Action::Unrecognized`
// so they can be quarantined instead of dropped. The slot is decoded record
// by record: one damaged record never hides the others.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

// ============================================================================
// PAYLOADS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub entity_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub entity_id: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistAdd {
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDismiss {
    pub reminder_id: String,
}

// ============================================================================
// ACTION
// ============================================================================

pub const STATUS_UPDATE: &str = "status_update";
pub const NOTE_UPDATE: &str = "note_update";
pub const SHORTLIST_ADD: &str = "shortlist_add";
pub const REMINDER_DISMISS: &str = "reminder_dismiss";

/// Type given to persisted records that could not be decoded at all
pub const CORRUPT_RECORD: &str = "corrupt_record";

/// A user mutation waiting for delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    StatusUpdate(StatusUpdate),
    NoteUpdate(NoteUpdate),
    ShortlistAdd(ShortlistAdd),
    ReminderDismiss(ReminderDismiss),

    /// Persisted record with an unknown type, or a payload that does not
    /// fit its type. Never delivered; quarantined on the next drain.
    Unrecognized { kind: String, payload: Value },
}

impl Action {
    /// Wire name of the action type
    pub fn kind(&self) -> &str {
        match self {
            Action::StatusUpdate(_) => STATUS_UPDATE,
            Action::NoteUpdate(_) => NOTE_UPDATE,
            Action::ShortlistAdd(_) => SHORTLIST_ADD,
            Action::ReminderDismiss(_) => REMINDER_DISMISS,
            Action::Unrecognized { kind, .. } => kind,
        }
    }

    fn decode(kind: String, payload: Value) -> Action {
        let decoded = match kind.as_str() {
            STATUS_UPDATE => serde_json::from_value(payload.clone()).map(Action::StatusUpdate),
            NOTE_UPDATE => serde_json::from_value(payload.clone()).map(Action::NoteUpdate),
            SHORTLIST_ADD => serde_json::from_value(payload.clone()).map(Action::ShortlistAdd),
            REMINDER_DISMISS => serde_json::from_value(payload.clone()).map(Action::ReminderDismiss),
            _ => return Action::Unrecognized { kind, payload },
        };

        decoded.unwrap_or(Action::Unrecognized { kind, payload })
    }

    fn encode(&self) -> serde_json::Result<(String, Value)> {
        let payload = match self {
            Action::StatusUpdate(p) => serde_json::to_value(p)?,
            Action::NoteUpdate(p) => serde_json::to_value(p)?,
            Action::ShortlistAdd(p) => serde_json::to_value(p)?,
            Action::ReminderDismiss(p) => serde_json::to_value(p)?,
            Action::Unrecognized { payload, .. } => payload.clone(),
        };

        Ok((self.kind().to_string(), payload))
    }
}

impl From<StatusUpdate> for Action {
    fn from(p: StatusUpdate) -> Self {
        Action::StatusUpdate(p)
    }
}

impl From<NoteUpdate> for Action {
    fn from(p: NoteUpdate) -> Self {
        Action::NoteUpdate(p)
    }
}

impl From<ShortlistAdd> for Action {
    fn from(p: ShortlistAdd) -> Self {
        Action::ShortlistAdd(p)
    }
}

impl From<ReminderDismiss> for Action {
    fn from(p: ReminderDismiss) -> Self {
        Action::ReminderDismiss(p)
    }
}

// ============================================================================
// QUEUED ACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "StoredAction")]
pub struct QueuedAction {
    pub id: String,
    pub action: Action,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
}

impl QueuedAction {
    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}

/// Persisted record layout
#[derive(Serialize, Deserialize)]
struct StoredAction {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    timestamp: DateTime<Utc>,
    #[serde(rename = "retryCount", default)]
    retry_count: u32,
}

impl From<StoredAction> for QueuedAction {
    fn from(stored: StoredAction) -> Self {
        QueuedAction {
            id: stored.id,
            action: Action::decode(stored.kind, stored.payload),
            enqueued_at: stored.timestamp,
            retry_count: stored.retry_count,
        }
    }
}

impl Serialize for QueuedAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (kind, payload) = self.action.encode().map_err(serde::ser::Error::custom)?;
        StoredAction {
            id: self.id.clone(),
            kind,
            payload,
            timestamp: self.enqueued_at,
            retry_count: self.retry_count,
        }
        .serialize(serializer)
    }
}

// ============================================================================
// SLOT DECODING
// ============================================================================

/// Decode a persisted queue slot. Records that fail to decode come back as
/// quarantined `corrupt_record` entries carrying the raw record as payload,
/// so they show up in the failed list and can be removed by id. A slot that
/// is not a JSON array is kept the same way, as a single entry.
pub fn decode_slot(text: &str, max_retries: u32) -> Vec<QueuedAction> {
    let records = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(records)) => records,
        Ok(other) => {
            warn!("Queue slot is not a list, quarantining it whole");
            return vec![corrupt_record(other, max_retries)];
        }
        Err(e) => {
            warn!(error = %e, "Queue slot is not valid JSON, quarantining it whole");
            return vec![corrupt_record(Value::String(text.to_string()), max_retries)];
        }
    };

    records
        .into_iter()
        .map(|record| match QueuedAction::deserialize(&record) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "Quarantining undecodable queue record");
                corrupt_record(record, max_retries)
            }
        })
        .collect()
}

fn corrupt_record(raw: Value, max_retries: u32) -> QueuedAction {
    // Derived from content when the record has no usable id, so it stays
    // addressable across loads
    let id = match raw.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let digest = format!("{:x}", Sha256::digest(raw.to_string().as_bytes()));
            format!("corrupt-{}", &digest[..12])
        }
    };

    let enqueued_at = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    QueuedAction {
        id,
        action: Action::Unrecognized {
            kind: CORRUPT_RECORD.to_string(),
            payload: raw,
        },
        enqueued_at,
        retry_count: max_retries,
    }
}

// ============================================================================
// TESTS
// ============================================================================
