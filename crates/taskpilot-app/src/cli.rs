//! CLI argument definitions for the Taskpilot server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::{Path, PathBuf};

use taskpilot_core::config::{StorageBackend, TaskpilotConfig};
use taskpilot_core::error::TaskpilotError;

/// Taskpilot - a conversational to-do assistant served over HTTP.
#[derive(Parser, Debug)]
#[command(name = "taskpilot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for the session database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Keep sessions in memory instead of SQLite.
    #[arg(long = "memory")]
    pub memory: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TASKPILOT_CONFIG env var > ~/.taskpilot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TASKPILOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > TASKPILOT_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        self.resolve_port_with(config_port, std::env::var("TASKPILOT_PORT").ok())
    }

    fn resolve_port_with(&self, config_port: u16, env_port: Option<String>) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        env_port
            .and_then(|val| val.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Apply every command-line and environment override to a loaded config.
    pub fn apply_overrides(&self, config: &mut TaskpilotConfig) {
        config.server.port = self.resolve_port(config.server.port);
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.memory {
            config.storage.backend = StorageBackend::Memory;
        }
    }
}

/// Load the config file, falling back to defaults.
///
/// The load error is returned instead of logged so the caller can report it
/// once the tracing subscriber is installed.
pub fn load_config(path: &Path) -> (TaskpilotConfig, Option<TaskpilotError>) {
    match TaskpilotConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (TaskpilotConfig::default(), Some(e)),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home_dir().join(rest),
        None => PathBuf::from(path),
    }
}

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    home_dir().join(".taskpilot").join("config.toml")
}
