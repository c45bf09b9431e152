//! SQLite-backed session store.
//!
//! Each session is one row holding the JSON-encoded [`SessionState`].
//! Queries run on the blocking pool since rusqlite is synchronous.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tracing::debug;

use taskpilot_core::error::{Result, TaskpilotError};
use taskpilot_core::types::{SessionState, Timestamp};

use crate::db::Database;
use crate::store::SessionStore;

pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn read(db: &Database, session_id: &str) -> Result<Option<SessionState>> {
        let blob: Option<String> = db.with_conn(|conn| {
            conn.query_row(
                "SELECT state FROM sessions WHERE id = ?1",
                rusqlite::params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| TaskpilotError::Storage(format!("Failed to read session: {}", e)))
        })?;

        match blob {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write(db: &Database, session_id: &str, json: &str) -> Result<()> {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
                rusqlite::params![session_id, json, Timestamp::now().0],
            )
            .map_err(|e| TaskpilotError::Storage(format!("Failed to write session: {}", e)))?;
            Ok(())
        })
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TaskpilotError::Storage(format!("Storage task failed: {}", e)))?
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        let db = Arc::clone(&self.db);
        let id = session_id.to_string();
        blocking(move || Self::read(&db, &id)).await
    }

    async fn put(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        debug!(session_id, bytes = json.len(), "Persisting session");
        let db = Arc::clone(&self.db);
        let id = session_id.to_string();
        blocking(move || Self::write(&db, &id, &json)).await
    }
}
