//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use taskpilot_core::error::TaskpilotError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), TaskpilotError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| TaskpilotError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            TaskpilotError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: sessions");
    }

    Ok(())
}

/// Version 1: one opaque JSON state blob per session.
fn apply_v1(conn: &Connection) -> Result<(), TaskpilotError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            state       TEXT NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'sessions');
        ",
    )
    .map_err(|e| TaskpilotError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
