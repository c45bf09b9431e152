//! Taskpilot server binary.
//!
//! Loads configuration, opens the session store, builds the model client
//! and serves the HTTP API.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskpilot_api::{start_server, AppState};
use taskpilot_chat::TurnPipeline;
use taskpilot_core::config::{StorageBackend, TaskpilotConfig};
use taskpilot_core::error::TaskpilotError;
use taskpilot_model::{build_client, GenerationParams};
use taskpilot_storage::{Database, MemoryStore, SessionStore, SqliteSessionStore};

use cli::{expand_home, load_config, CliArgs};

/// Open the configured session store.
fn open_store(config: &TaskpilotConfig) -> Result<Arc<dyn SessionStore>, TaskpilotError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            let data_dir = expand_home(&config.general.data_dir);
            let db_path = data_dir.join(&config.storage.db_file);
            let db = Database::new(&db_path)?;
            tracing::info!(path = %db_path.display(), "SQLite session store opened");
            Ok(Arc::new(SqliteSessionStore::new(Arc::new(db))))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let (mut config, load_error) = load_config(&config_file);
    args.apply_overrides(&mut config);

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Taskpilot v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    let store = open_store(&config)?;

    let model = build_client(&config.model)?;
    tracing::info!(
        provider = ?config.model.provider,
        model = model.model_id(),
        "Model client ready"
    );

    let pipeline = TurnPipeline::new(
        store,
        model,
        config.chat.clone(),
        GenerationParams::from(&config.model),
    );
    if config.chat.serialize_turns {
        tracing::info!("Per-session turn serialization enabled");
    }

    let state = AppState::new(pipeline, config.server.clone());
    if let Err(e) = start_server(state).await {
        tracing::error!(
            host = %config.server.host,
            port = config.server.port,
            error = %e,
            "API server stopped"
        );
        return Err(e.into());
    }

    Ok(())
}
