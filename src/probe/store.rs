//! Best-effort verdict persistence

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::probe::verdict::StoredVerdict;

/// Key under which the single verdict record is stored.
const VERDICT_KEY: &str = "is_tls_compatible";

/// Persistence for the compatibility verdict.
///
/// The store can never fail observably: reads fold every failure
/// (missing row, corrupt value, storage error) into `None`, and writes
/// are fire-and-forget. Availability is probed once at open and stays
/// fixed for the life of the store.
pub struct VerdictStore {
    conn: Option<Mutex<Connection>>,
}

impl VerdictStore {
    /// Opens (or creates) the store at `db_path`. An unopenable database
    /// yields a permanently unavailable store, not an error.
    pub fn open(db_path: &Path) -> Self {
        match Self::try_open(db_path) {
            Ok(conn) => {
                info!("Verdict store initialized at {:?}", db_path);
                Self {
                    conn: Some(Mutex::new(conn)),
                }
            }
            Err(e) => {
                debug!("Verdict store unavailable, persistence disabled: {}", e);
                Self { conn: None }
            }
        }
    }

    /// A store that never persists anything.
    pub fn unavailable() -> Self {
        Self { conn: None }
    }

    /// Whether a backing database was opened.
    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    fn try_open(db_path: &Path) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS verdict (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(conn)
    }

    fn lock_conn(&self) -> Option<MutexGuard<'_, Connection>> {
        self.conn
            .as_ref()
            .map(|conn| conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// Loads the persisted record, if any. A missing key, malformed
    /// value, and storage errors all read as absent.
    pub fn load(&self) -> Option<StoredVerdict> {
        let conn = self.lock_conn()?;

        let raw = match conn.query_row(
            "SELECT value FROM verdict WHERE key = ?1",
            [VERDICT_KEY],
            |row| row.get::<_, String>(0),
        ) {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => return None,
            Err(e) => {
                debug!("Failed to read verdict record: {}", e);
                return None;
            }
        };

        let decoded = StoredVerdict::decode(&raw);
        if decoded.is_none() {
            debug!("Ignoring malformed verdict record: {:?}", raw);
        }
        decoded
    }

    /// Persists `record`, replacing any previous one. Failures are
    /// logged and dropped.
    pub fn save(&self, record: &StoredVerdict) {
        let Some(conn) = self.lock_conn() else {
            return;
        };

        let result = conn.execute(
            r#"
            INSERT INTO verdict (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            (VERDICT_KEY, record.encode()),
        );

        if let Err(e) = result {
            debug!("Failed to persist verdict record: {}", e);
        }
    }
}
