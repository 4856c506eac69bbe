pub mod migrations;
pub mod queries;

use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use rusqlite::Connection;

use crate::services::store::{BookingSnapshot, SnapshotStore};

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// SQLite-backed snapshot storage for the booking store.
pub struct SqliteSnapshots {
    conn: Mutex<Connection>,
}

impl SqliteSnapshots {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> anyhow::Result<Self> {
        Ok(Self::new(init_db(path)?))
    }
}

impl SnapshotStore for SqliteSnapshots {
    fn load(&self) -> anyhow::Result<Option<BookingSnapshot>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        queries::load_snapshot(&conn).context("failed to load bookings")
    }

    fn save(&self, snapshot: &BookingSnapshot) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        queries::save_snapshot(&mut conn, snapshot).context("failed to save bookings")
    }
}
