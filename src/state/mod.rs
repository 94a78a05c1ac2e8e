//! Setup file (.smw.json) Management Module
//!
//! Persists the per-installation schema state, including:
//! - Upgrade key and maintenance mode
//! - Database requirement versions
//! - Latest/previous software version
//! - Incomplete maintenance tasks

mod error;
mod setup_file;
mod upgrade_key;
mod writer;

pub use error::{Result, SetupError};
pub use setup_file::{
    DatabaseRequirements, IncompleteTask, SchemaStatus, SetupFile, DB_REQUIREMENTS, FILE_NAME,
    INCOMPLETE_TASKS, LAST_OPTIMIZATION_RUN, LATEST_VERSION, MAINTENANCE_MODE,
    POPULATE_HASH_FIELD_COMPLETE, PREVIOUS_VERSION, REBUILD_INDEX_RUN_COMPLETE, UPGRADE_KEY,
};
pub use upgrade_key::{make_upgrade_key, upgrade_key_base};
pub use writer::{AtomicFileWriter, StateFileWriter};
