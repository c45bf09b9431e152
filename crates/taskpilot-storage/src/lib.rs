//! Taskpilot session storage.
//!
//! Defines the [`SessionStore`] seam and two backends: an in-memory map
//! and a WAL-mode SQLite database holding one JSON blob per session.

pub mod db;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

pub use db::Database;
pub use memory::MemoryStore;
pub use sqlite::SqliteSessionStore;
pub use store::SessionStore;
