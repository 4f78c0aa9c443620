// 🗄️ Key-value slots for device-local persistence
//
// SqliteStore survives restarts (WAL mode for crash recovery).
// MemoryStore is for tests and ephemeral sessions. Both offer an atomic
// update() that the queue uses for every write.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Boxed slot transform used by `KeyValueStore::update`. Receives the
/// current value and returns the replacement; `None` removes the slot.
pub type SlotUpdate<'a> = dyn FnMut(Option<String>) -> Result<Option<String>> + 'a;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Atomic read-modify-write of one slot, also against other handles on
    /// the same backing storage. Nothing is written when `f` fails.
    fn update(&self, key: &str, f: &mut SlotUpdate<'_>) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn update(&self, key: &str, f: &mut SlotUpdate<'_>) -> Result<()> {
        (**self).update(key, f)
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// How long a write waits on another connection holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;

        // Other processes (the CLI, a second app handle) may share the file
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn read_slot(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("Failed to read slot {:?}", key))
}

fn write_slot(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("Failed to write slot {:?}", key))?;

    debug!(key, bytes = value.len(), "wrote slot");
    Ok(())
}

fn delete_slot(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
        .with_context(|| format!("Failed to remove slot {:?}", key))?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        read_slot(&*self.conn()?, key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        write_slot(&*self.conn()?, key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        delete_slot(&*self.conn()?, key)
    }

    fn update(&self, key: &str, f: &mut SlotUpdate<'_>) -> Result<()> {
        let mut conn = self.conn()?;

        // IMMEDIATE takes the write lock up front, so a second handle cannot
        // read the same value between our read and our write
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .with_context(|| format!("Failed to lock slot {:?}", key))?;

        match f(read_slot(&tx, key)?)? {
            Some(value) => write_slot(&tx, key, &value)?,
            None => delete_slot(&tx, key)?,
        }

        tx.commit()
            .with_context(|| format!("Failed to commit slot {:?}", key))?;
        Ok(())
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.slots()?.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut SlotUpdate<'_>) -> Result<()> {
        let mut slots = self.slots()?;
        match f(slots.get(key).cloned())? {
            Some(value) => slots.insert(key.to_string(), value),
            None => slots.remove(key),
        };
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
