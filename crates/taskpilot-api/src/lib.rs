//! Taskpilot API crate - axum HTTP server, route handlers, SSE streaming.
//!
//! Exposes the turn pipeline over HTTP: batch and streamed chat turns, the
//! per-session task list, and a health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
