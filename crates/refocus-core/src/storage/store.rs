//! Durable session record storage.
//!
//! One record per game variant, kept as JSON in a SQLite kv table under the
//! key `<game>_session_v1`. The version suffix lets a future schema change
//! invalidate old records, which simply read back as "no session".
//!
//! Handles created via [`SessionStore::handle`] model separate execution
//! contexts (tabs) sharing the same durable storage: a write made through
//! one handle notifies subscribers registered on every *other* handle, the
//! storage-event analog of the web platform. The writer never observes its
//! own write. Separate processes share the records but get no live
//! notification; they reconcile on their next load.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;

use super::data_dir;

/// Storage key for a game's session record.
pub fn session_key(game: &str) -> String {
    format!("{game}_session_v1")
}

/// The durable, shared session state. Single source of truth for "where are
/// we in time"; everything else is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Which stage plan this record belongs to.
    pub game: String,
    /// When the overall session began (ms since epoch).
    pub start_at: i64,
    /// Last known stage index.
    pub current_stage_index: usize,
    /// When the current stage began (ms since epoch).
    pub stage_started_at: i64,
}

/// Change notification delivered to subscribers on other handles.
/// `value` is the new serialized record, or `None` when it was cleared.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub key: String,
    pub value: Option<String>,
}

type ChangeCallback = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

struct Listener {
    id: u64,
    origin: Uuid,
    callback: ChangeCallback,
}

struct StoreShared {
    conn: Mutex<Connection>,
    listeners: Mutex<Vec<Listener>>,
    next_listener: AtomicU64,
}

/// Handle onto the shared session storage.
pub struct SessionStore {
    shared: Arc<StoreShared>,
    origin: Uuid,
}

/// RAII subscription guard; dropping it unsubscribes.
pub struct Subscription {
    shared: Arc<StoreShared>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.retain(|l| l.id != self.id);
        }
    }
}

impl SessionStore {
    /// Open the store at `<data_dir>/refocus.db`, creating the schema if
    /// needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("refocus.db");
        let conn = Connection::open(&path)
            .map_err(|source| StoreError::OpenFailed { path, source })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: std::path::PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            shared: Arc::new(StoreShared {
                conn: Mutex::new(conn),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
            origin: Uuid::new_v4(),
        })
    }

    /// Create another handle onto the same storage with its own origin,
    /// modeling a separate execution context (another tab).
    pub fn handle(&self) -> SessionStore {
        SessionStore {
            shared: Arc::clone(&self.shared),
            origin: Uuid::new_v4(),
        }
    }

    /// Register a callback fired on writes made through other handles.
    ///
    /// The callback runs outside the listener registry lock, so it may read
    /// from or write to the store and manage subscriptions itself.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.shared.listeners.lock() {
            listeners.push(Listener {
                id,
                origin: self.origin,
                callback: Arc::new(callback),
            });
        }
        Subscription {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    /// Read the persisted record for `game`.
    ///
    /// Any read or parse failure, and a record whose `game` field does not
    /// match the key, is treated as absent: the caller always gets to start
    /// fresh rather than see an error.
    pub fn load(&self, game: &str) -> Option<SessionRecord> {
        let key = session_key(game);
        let value = match self.kv_get(&key) {
            Ok(value) => value?,
            Err(err) => {
                warn!(key = %key, error = %err, "session record read failed, treating as absent");
                return None;
            }
        };
        match serde_json::from_str::<SessionRecord>(&value) {
            Ok(record) if record.game == game => Some(record),
            Ok(record) => {
                warn!(key = %key, found = %record.game, "session record game mismatch, treating as absent");
                None
            }
            Err(err) => {
                warn!(key = %key, error = %err, "malformed session record, treating as absent");
                None
            }
        }
    }

    /// Overwrite the persisted record for its game.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let key = session_key(&record.game);
        let value = serde_json::to_string(record)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        debug!(key = %key, stage = record.current_stage_index, "session record saved");
        self.notify(&key, Some(value));
        Ok(())
    }

    /// Remove the persisted record for `game`.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn clear(&self, game: &str) -> Result<(), StoreError> {
        let key = session_key(game);
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        debug!(key = %key, "session record cleared");
        self.notify(&key, None);
        Ok(())
    }

    fn notify(&self, key: &str, value: Option<String>) {
        let event = StorageEvent {
            key: key.to_string(),
            value,
        };
        // Snapshot the callbacks and release the registry lock before
        // invoking any of them; a subscriber may write back to the store.
        let callbacks: Vec<ChangeCallback> = match self.shared.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|l| l.origin != self.origin)
                .map(|l| Arc::clone(&l.callback))
                .collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(&event);
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.shared.conn.lock().map_err(|_| StoreError::Locked)
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        match stmt.query_row(params![key], |row| row.get::<_, String>(0)) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    fn kv_set_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Queue-backed subscriber: pushes change events into a shared inbox the
/// owner drains on its own cadence.
pub(crate) fn queue_subscriber(
    inbox: Arc<Mutex<VecDeque<StorageEvent>>>,
    key: String,
) -> impl Fn(&StorageEvent) + Send + Sync + 'static {
    move |event: &StorageEvent| {
        if event.key == key {
            if let Ok(mut queue) = inbox.lock() {
                queue.push_back(event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(game: &str, start_at: i64) -> SessionRecord {
        SessionRecord {
            game: game.to_string(),
            start_at,
            current_stage_index: 0,
            stage_started_at: start_at,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = SessionStore::open_memory().unwrap();
        let rec = SessionRecord {
            game: "money_stack".into(),
            start_at: 1_700_000_000_000,
            current_stage_index: 3,
            stage_started_at: 1_700_000_900_000,
        };
        store.save(&rec).unwrap();
        assert_eq!(store.load("money_stack").unwrap(), rec);
    }

    #[test]
    fn load_missing_returns_none() {
        let store = SessionStore::open_memory().unwrap();
        assert!(store.load("money_stack").is_none());
    }

    #[test]
    fn malformed_record_reads_as_absent() {
        let store = SessionStore::open_memory().unwrap();
        store
            .kv_set_raw(&session_key("money_stack"), "{not json")
            .unwrap();
        assert!(store.load("money_stack").is_none());
    }

    #[test]
    fn game_mismatch_reads_as_absent() {
        let store = SessionStore::open_memory().unwrap();
        let rec = record("ping_money", 1_700_000_000_000);
        let json = serde_json::to_string(&rec).unwrap();
        store.kv_set_raw(&session_key("money_stack"), &json).unwrap();
        assert!(store.load("money_stack").is_none());
    }

    #[test]
    fn clear_removes_record() {
        let store = SessionStore::open_memory().unwrap();
        store.save(&record("money_stack", 1_000)).unwrap();
        store.clear("money_stack").unwrap();
        assert!(store.load("money_stack").is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_string(&record("money_stack", 42)).unwrap();
        assert!(json.contains("\"startAt\":42"));
        assert!(json.contains("\"currentStageIndex\":0"));
        assert!(json.contains("\"stageStartedAt\":42"));
    }

    #[test]
    fn other_handles_are_notified_writer_is_not() {
        let store = SessionStore::open_memory().unwrap();
        let other = store.handle();

        let seen: Arc<Mutex<Vec<StorageEvent>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |event| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(event.clone());
            }
        });

        // Writes through the subscribing handle are suppressed.
        store.save(&record("money_stack", 1_000)).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        // Writes through any other handle are delivered.
        other.save(&record("money_stack", 2_000)).unwrap();
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, session_key("money_stack"));
        assert!(events[0].value.as_deref().unwrap().contains("\"startAt\":2000"));
    }

    #[test]
    fn clear_notifies_with_empty_payload() {
        let store = SessionStore::open_memory().unwrap();
        let other = store.handle();

        let seen: Arc<Mutex<Vec<StorageEvent>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |event| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(event.clone());
            }
        });

        other.save(&record("money_stack", 1_000)).unwrap();
        other.clear("money_stack").unwrap();
        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[1].value.is_none());
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let store = SessionStore::open_memory().unwrap();
        let other = store.handle();

        let seen: Arc<Mutex<Vec<StorageEvent>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |event| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(event.clone());
            }
        });

        other.save(&record("money_stack", 1_000)).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        drop(sub);
        other.save(&record("money_stack", 2_000)).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn subscriber_may_write_back_to_the_store() {
        let store = SessionStore::open_memory().unwrap();
        let other = store.handle();
        let writer = store.handle();

        // Reacts to a save by clearing the record through its own handle.
        // The follow-up clear notification has no payload, ending the chain.
        let _sub = store.subscribe(move |event| {
            if event.value.is_some() {
                writer.clear("money_stack").unwrap();
            }
        });

        other.save(&record("money_stack", 1_000)).unwrap();
        assert!(store.load("money_stack").is_none());
    }
}
