//! SQLite-backed agent state
//!
//! State is kept as JSON documents in a small key/value table, mirroring the
//! preferences file the host app shares with the sync service.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use rusqlite_migration::{M, Migrations};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::SyncStore;
use crate::models::{BootRecord, DeviceConfig, SyncState};

const KEY_DEVICE_CONFIG: &str = "device_config";
const KEY_SYNC_STATE: &str = "sync_state";
const KEY_BOOT_RECORD: &str = "boot_record";

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE prefs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )])
}

/// SQLite-based agent state
pub struct SqliteSyncStore {
    conn: Mutex<Connection>,
}

impl SqliteSyncStore {
    /// Open (or create) the state database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        // WAL lets the host UI read while the service writes; busy_timeout
        // covers the brief overlap when both write.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.conn.lock().unwrap();
        read_json(&conn, key)
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        write_json(&conn, key, value)
    }
}

fn read_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let value: Option<String> = conn
        .query_row("SELECT value FROM prefs WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .with_context(|| format!("Failed to read {}", key))?;

    value
        .map(|v| serde_json::from_str(&v).with_context(|| format!("Failed to parse stored {}", key)))
        .transpose()
}

fn write_json<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO prefs (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, json],
    )
    .with_context(|| format!("Failed to save {}", key))?;
    Ok(())
}

impl SyncStore for SqliteSyncStore {
    fn get_device_config(&self) -> Result<Option<DeviceConfig>> {
        self.get_json(KEY_DEVICE_CONFIG)
    }

    fn save_device_config(&self, config: DeviceConfig) -> Result<()> {
        self.put_json(KEY_DEVICE_CONFIG, &config)
    }

    fn get_sync_state(&self) -> Result<SyncState> {
        Ok(self.get_json(KEY_SYNC_STATE)?.unwrap_or_default())
    }

    fn save_sync_state(&self, state: SyncState) -> Result<()> {
        self.put_json(KEY_SYNC_STATE, &state)
    }

    fn update_sync_state(
        &self,
        update: &mut dyn FnMut(SyncState) -> SyncState,
    ) -> Result<SyncState> {
        let mut conn = self.conn.lock().unwrap();
        // IMMEDIATE takes the write lock up front, so another connection
        // cannot slip a write in between our read and write.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin sync state update")?;
        let current: SyncState = read_json(&tx, KEY_SYNC_STATE)?.unwrap_or_default();
        let next = update(current);
        write_json(&tx, KEY_SYNC_STATE, &next)?;
        tx.commit().context("Failed to commit sync state update")?;
        Ok(next)
    }

    fn get_boot_record(&self) -> Result<Option<BootRecord>> {
        self.get_json(KEY_BOOT_RECORD)
    }

    fn save_boot_record(&self, record: BootRecord) -> Result<()> {
        self.put_json(KEY_BOOT_RECORD, &record)
    }
}
