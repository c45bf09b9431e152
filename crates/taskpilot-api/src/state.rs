//! Application state shared across all route handlers.

use std::time::Instant;

use taskpilot_chat::TurnPipeline;
use taskpilot_core::config::ServerConfig;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Turn pipeline bound to the configured store and model.
    pub pipeline: TurnPipeline,
    /// Listen address and CORS settings.
    pub server: ServerConfig,
    /// Server start time for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(pipeline: TurnPipeline, server: ServerConfig) -> Self {
        Self {
            pipeline,
            server,
            start_time: Instant::now(),
        }
    }
}
