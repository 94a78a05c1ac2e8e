// smw-setup - Schema/setup state store for Semantic MediaWiki installations
// Tracks upgrade keys, maintenance mode and incomplete setup tasks in .smw.json

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod context;
pub mod state;
pub mod utils;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use config::SetupConfig;
pub use context::{Runtime, SetupContext};
pub use state::{IncompleteTask, SchemaStatus, SetupError, SetupFile};
