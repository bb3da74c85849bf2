//! Persistence for partners, devices and inspection records.
//!
//! The scheduler talks to storage only through [`DeviceStore`]: a snapshot
//! of a partner's devices, a live change feed, and a bulk write of the
//! `proposal` field. [`Storage`] implements it on a single `SQLite` file
//! that several processes may share:
//!
//! ```text
//! partner        id, name, address
//! device         partner_id, id, proposal (JSON)
//! inspection     partner_id, device_id, recorded_at, next_due
//! device_change  seq, partner_id, device_id   (filled by triggers)
//! ```

mod device;
mod feed;
#[cfg(test)]
pub mod memory;
mod partner;

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use rusqlite::Connection;

use crate::model::{Device, Proposal};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("partner not found: {0}")]
    PartnerNotFound(String),

    #[error("partner already exists: {0}")]
    PartnerAlreadyExists(String),

    #[error("device not found: {partner_id}/{device_id}")]
    DeviceNotFound {
        partner_id: String,
        device_id: String,
    },

    #[error("device already exists: {partner_id}/{device_id}")]
    DeviceAlreadyExists {
        partner_id: String,
        device_id: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage connection poisoned by a panicked writer")]
    Poisoned,
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Invoked with each batch of changed devices, on the feed's own thread.
pub type ChangeCallback = Box<dyn FnMut(Vec<Device>) + Send + 'static>;

/// The persistence collaborator the scheduler depends on.
pub trait DeviceStore: Send + Sync {
    /// Current devices of a partner, with `next_due_date` resolved from
    /// their latest inspection.
    fn device_snapshot(&self, partner_id: &str) -> Result<Vec<Device>>;

    /// Starts delivering changed device documents to `on_change` until the
    /// returned subscription is cancelled or dropped.
    ///
    /// Payloads are raw device documents: fields derived elsewhere, such as
    /// `next_due_date`, are left empty.
    fn subscribe(&self, partner_id: &str, on_change: ChangeCallback) -> Result<Subscription>;

    /// Writes `proposal` to every listed device, or removes it when `None`,
    /// as one atomic batch.
    fn apply_proposal(
        &self,
        partner_id: &str,
        device_ids: &[String],
        proposal: Option<&Proposal>,
    ) -> Result<()>;
}

/// A live change-feed registration. Cancelled on drop.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stops the feed. Returns once no further callbacks can run.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS partner (
    id      TEXT PRIMARY KEY,
    name    TEXT NOT NULL,
    address TEXT
);

CREATE TABLE IF NOT EXISTS device (
    partner_id  TEXT NOT NULL REFERENCES partner (id),
    id          TEXT NOT NULL,
    proposal    TEXT,
    PRIMARY KEY (partner_id, id)
);

CREATE TABLE IF NOT EXISTS inspection (
    partner_id  TEXT NOT NULL,
    device_id   TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    next_due    TEXT,
    FOREIGN KEY (partner_id, device_id) REFERENCES device (partner_id, id)
);

CREATE TABLE IF NOT EXISTS device_change (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    partner_id TEXT NOT NULL,
    device_id  TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS device_inserted AFTER INSERT ON device
BEGIN
    INSERT INTO device_change (partner_id, device_id) VALUES (NEW.partner_id, NEW.id);
END;

CREATE TRIGGER IF NOT EXISTS device_updated AFTER UPDATE ON device
BEGIN
    INSERT INTO device_change (partner_id, device_id) VALUES (NEW.partner_id, NEW.id);
END;
";

/// `SQLite`-backed storage.
pub struct Storage {
    path: PathBuf,
    conn: Mutex<Connection>,
    poll_interval: Duration,
}

impl Storage {
    /// Opens (creating if needed) the store at `path`.
    ///
    /// `poll_interval` is how often change feeds look for new writes.
    pub fn open(path: impl Into<PathBuf>, poll_interval: Duration) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = connect(&path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            poll_interval,
        })
    }

    /// Returns the default store location: `~/.rigcal/rigcal.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".rigcal").join("rigcal.sqlite"))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

/// Opens a connection configured for sharing the file with other processes.
fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    Ok(conn)
}
