pub mod config;
pub mod error;
pub mod types;

pub use config::TaskpilotConfig;
pub use error::{Result, TaskpilotError};
pub use types::*;
