//! Database module for the assistant
//!
//! Persists Google OAuth credentials per user id.

mod schema;

use schema::{SCHEMA, UPSERT_CREDENTIALS};

use crate::google::GoogleCredentials;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored credentials are not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ==================== Credential Operations ====================

    /// Load the stored credentials for a user, if any
    pub fn load_credentials(&self, user_id: &str) -> DbResult<Option<GoogleCredentials>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT google_credentials FROM user_tokens WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the credentials for a user
    pub fn store_credentials(&self, user_id: &str, credentials: &GoogleCredentials) -> DbResult<()> {
        let json = serde_json::to_string(credentials)?;
        let conn = self.conn()?;
        conn.execute(
            UPSERT_CREDENTIALS,
            params![user_id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
