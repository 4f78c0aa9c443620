// 📮 Durable Action Queue - at-least-once delivery for user mutations
//
// enqueue() persists an action and returns immediately. drain() replays the
// persisted snapshot once, in insertion order:
// - success          → action removed
// - failure/timeout  → retry_count += 1, action stays in place
// - retry_count >= max_retries → skipped, reported by get_failed_actions()
// - unrecognized type → quarantined immediately
//
// Only one drain runs at a time. enqueue() may interleave with a drain, even
// from another store handle on the same database: every write is an atomic
// read-modify-write in the store, never a blind overwrite of the drain's
// snapshot. Damaged records are quarantined one by one on load.

pub mod action;
pub mod store;

pub use action::{
    Action, NoteUpdate, QueuedAction, ReminderDismiss, ShortlistAdd, StatusUpdate,
};
pub use store::{KeyValueStore, MemoryStore, SlotUpdate, SqliteStore};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;

// ============================================================================
// HANDLERS
// ============================================================================

/// Backend calls, one per action kind. Each is expected to make a single
/// network round-trip and resolve or fail.
pub trait ActionHandler {
    fn update_status(&self, payload: &StatusUpdate) -> impl Future<Output = Result<()>> + Send;
    fn update_note(&self, payload: &NoteUpdate) -> impl Future<Output = Result<()>> + Send;
    fn add_to_shortlist(&self, payload: &ShortlistAdd) -> impl Future<Output = Result<()>> + Send;
    fn dismiss_reminder(&self, payload: &ReminderDismiss) -> impl Future<Output = Result<()>> + Send;
}

enum Attempt {
    Delivered,
    Failed(anyhow::Error),
    Unroutable,
}

async fn dispatch<H: ActionHandler>(handler: &H, action: &Action) -> Attempt {
    let result = match action {
        Action::StatusUpdate(p) => handler.update_status(p).await,
        Action::NoteUpdate(p) => handler.update_note(p).await,
        Action::ShortlistAdd(p) => handler.add_to_shortlist(p).await,
        Action::ReminderDismiss(p) => handler.dismiss_reminder(p).await,
        Action::Unrecognized { .. } => return Attempt::Unroutable,
    };

    match result {
        Ok(()) => Attempt::Delivered,
        Err(e) => Attempt::Failed(e),
    }
}

// ============================================================================
// DRAIN OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainOutcome {
    /// Delivered and removed
    pub processed: usize,

    /// Failed this pass, skipped as exhausted, or quarantined
    pub failed: usize,
}

// ============================================================================
// ACTION QUEUE
// ============================================================================

pub struct ActionQueue<S: KeyValueStore> {
    store: S,
    config: QueueConfig,
    /// At most one drain in flight
    drain_lock: tokio::sync::Mutex<()>,
}

impl<S: KeyValueStore> ActionQueue<S> {
    pub fn new(store: S, config: QueueConfig) -> Self {
        ActionQueue {
            store,
            config,
            drain_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    fn decode(&self, text: Option<&str>) -> Vec<QueuedAction> {
        text.map(|t| action::decode_slot(t, self.config.max_retries))
            .unwrap_or_default()
    }

    /// Atomic read-modify-write of the persisted queue. An empty queue
    /// removes the slot.
    fn update<T>(&self, f: impl FnOnce(&mut Vec<QueuedAction>) -> T) -> Result<T> {
        let mut f = Some(f);
        let mut result = None;

        self.store.update(&self.config.queue_key, &mut |current| {
            let mut actions = self.decode(current.as_deref());
            if let Some(f) = f.take() {
                result = Some(f(&mut actions));
            }

            if actions.is_empty() {
                return Ok(None);
            }
            let text = serde_json::to_string(&actions).context("Failed to serialize action queue")?;
            Ok(Some(text))
        })?;

        result.ok_or_else(|| anyhow!("Queue slot {:?} was not updated", self.config.queue_key))
    }

    fn snapshot(&self) -> Result<Vec<QueuedAction>> {
        let text = self.store.get(&self.config.queue_key)?;
        Ok(self.decode(text.as_deref()))
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Persist a new action with retry_count = 0. Returns its id.
    pub fn enqueue(&self, action: impl Into<Action>) -> Result<String> {
        let action = action.into();
        let now = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}", now.timestamp_millis(), &suffix[..9]);

        let kind = action.kind().to_string();
        let queued = QueuedAction {
            id: id.clone(),
            action,
            enqueued_at: now,
            retry_count: 0,
        };

        let depth = self.update(|actions| {
            actions.push(queued);
            actions.len()
        })?;

        debug!(id = %id, kind = %kind, depth, "enqueued action");
        Ok(id)
    }

    /// Replay the persisted queue once against `handler`.
    ///
    /// A second concurrent call waits for the first to finish.
    pub async fn drain<H: ActionHandler>(&self, handler: &H) -> Result<DrainOutcome> {
        let _drain = self.drain_lock.lock().await;

        let max_retries = self.config.max_retries;
        let snapshot = self.snapshot()?;
        let mut outcome = DrainOutcome::default();

        for queued in snapshot {
            if queued.is_exhausted(max_retries) {
                outcome.failed += 1;
                continue;
            }

            match self.attempt(handler, &queued.action).await {
                Attempt::Delivered => {
                    self.update(|actions| actions.retain(|a| a.id != queued.id))?;
                    outcome.processed += 1;
                }
                Attempt::Failed(err) => {
                    let retry_count = self.update(|actions| {
                        actions.iter_mut().find(|a| a.id == queued.id).map(|a| {
                            a.retry_count += 1;
                            a.retry_count
                        })
                    })?;
                    outcome.failed += 1;

                    match retry_count {
                        Some(count) if count >= max_retries => warn!(
                            id = %queued.id,
                            kind = queued.action.kind(),
                            error = %format!("{:#}", err),
                            "action exhausted its retries and is quarantined"
                        ),
                        _ => warn!(
                            id = %queued.id,
                            kind = queued.action.kind(),
                            retry_count = retry_count.unwrap_or(queued.retry_count + 1),
                            error = %format!("{:#}", err),
                            "action delivery failed"
                        ),
                    }
                }
                Attempt::Unroutable => {
                    self.update(|actions| {
                        if let Some(a) = actions.iter_mut().find(|a| a.id == queued.id) {
                            a.retry_count = a.retry_count.max(max_retries);
                        }
                    })?;
                    outcome.failed += 1;
                    warn!(
                        id = %queued.id,
                        kind = queued.action.kind(),
                        "unrecognized action quarantined"
                    );
                }
            }
        }

        info!(
            processed = outcome.processed,
            failed = outcome.failed,
            "drained action queue"
        );
        Ok(outcome)
    }

    async fn attempt<H: ActionHandler>(&self, handler: &H, action: &Action) -> Attempt {
        match self.config.handler_timeout() {
            Some(limit) => match tokio::time::timeout(limit, dispatch(handler, action)).await {
                Ok(attempt) => attempt,
                Err(_) => Attempt::Failed(anyhow!("handler timed out after {:?}", limit)),
            },
            None => dispatch(handler, action).await,
        }
    }

    /// Everything still persisted, in queue order
    pub fn pending_actions(&self) -> Result<Vec<QueuedAction>> {
        self.snapshot()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Actions that exhausted their retries and need manual resolution
    pub fn get_failed_actions(&self) -> Result<Vec<QueuedAction>> {
        let max_retries = self.config.max_retries;
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|a| a.is_exhausted(max_retries))
            .collect())
    }

    pub fn has_failed_actions(&self) -> Result<bool> {
        Ok(!self.get_failed_actions()?.is_empty())
    }

    /// Drop one action by id. Returns false if it was not queued.
    pub fn remove_action(&self, id: &str) -> Result<bool> {
        let removed = self.update(|actions| {
            let before = actions.len();
            actions.retain(|a| a.id != id);
            actions.len() != before
        })?;

        if removed {
            info!(id, "removed queued action");
        }
        Ok(removed)
    }

    /// Give a quarantined action a fresh retry budget.
    pub fn retry_action(&self, id: &str) -> Result<bool> {
        let reset = self.update(|actions| {
            actions
                .iter_mut()
                .find(|a| a.id == id)
                .map(|a| a.retry_count = 0)
                .is_some()
        })?;

        if reset {
            info!(id, "reset retry count");
        }
        Ok(reset)
    }

    /// Drop every quarantined action. Returns how many were dropped.
    pub fn clear_failed_actions(&self) -> Result<usize> {
        let max_retries = self.config.max_retries;
        let cleared = self.update(|actions| {
            let before = actions.len();
            actions.retain(|a| !a.is_exhausted(max_retries));
            before - actions.len()
        })?;

        info!(cleared, "cleared failed actions");
        Ok(cleared)
    }

    /// Unconditional wipe (logout, data reset)
    pub fn clear_queue(&self) -> Result<()> {
        self.store.remove(&self.config.queue_key)?;
        info!(key = %self.config.queue_key, "cleared action queue");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
