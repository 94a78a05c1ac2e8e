//! SetupFile - .smw.json CRUD operations

use super::error::{Result, SetupError};
use super::upgrade_key::make_upgrade_key;
use super::writer::{AtomicFileWriter, StateFileWriter};
use crate::context::{Runtime, SetupContext};
use crate::utils::version_at_least;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Setup file name, placed in the configured directory
pub const FILE_NAME: &str = ".smw.json";

pub const UPGRADE_KEY: &str = "upgrade_key";
pub const MAINTENANCE_MODE: &str = "maintenance_mode";
pub const DB_REQUIREMENTS: &str = "db_requirements";
pub const LAST_OPTIMIZATION_RUN: &str = "last_optimization_run";
pub const INCOMPLETE_TASKS: &str = "incomplete_tasks";
pub const LATEST_VERSION: &str = "latest_version";
pub const PREVIOUS_VERSION: &str = "previous_version";

/// Set to `false` by the SQL store until the hash field population finished
pub const POPULATE_HASH_FIELD_COMPLETE: &str = "populate_hash_field_complete";

/// Set to `false` by the Elasticsearch store until the index rebuild finished
pub const REBUILD_INDEX_RUN_COMPLETE: &str = "elastic.rebuild_index_run_complete";

/// Keys of earlier releases, removed on every write
const LEGACY_UPGRADE_KEY: &str = "upgradeKey";
const LEGACY_MAINTENANCE_MODE: &str = "in.maintenance_mode";

/// Completion flags: key => message reported while the flag is `false`
const COMPLETION_CHECKS: &[(&str, &str)] = &[
    (
        POPULATE_HASH_FIELD_COMPLETE,
        "smw-install-incomplete-populate-hash-field",
    ),
    (
        REBUILD_INDEX_RUN_COMPLETE,
        "smw-install-incomplete-elasticstore-indexrebuild",
    ),
];

/// A pending maintenance task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IncompleteTask {
    /// Task (or message key) without arguments
    Key(String),
    /// Task with its argument list
    WithArgs(String, Vec<String>),
}

impl IncompleteTask {
    pub fn key(&self) -> &str {
        match self {
            IncompleteTask::Key(key) | IncompleteTask::WithArgs(key, _) => key,
        }
    }
}

/// Database version requirement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRequirements {
    /// Version reported by the database server
    pub latest_version: String,
    /// Minimum version the software supports
    pub minimum_version: String,
}

/// Outcome of the schema gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    /// Stored key matches and no maintenance is running
    Good,
    /// No upgrade key recorded for this installation
    Missing,
    /// Configuration changed since the last setup run
    KeyMismatch,
    /// An upgrade is in progress
    Maintenance,
}

impl SchemaStatus {
    pub fn is_good(self) -> bool {
        self == SchemaStatus::Good
    }
}

/// Setup file for the current installation
///
/// Every operation takes the `SetupContext`, which owns the configuration and
/// the cached document. Writes go through a `StateFileWriter`.
#[derive(Debug, Clone, Default)]
pub struct SetupFile<W = AtomicFileWriter> {
    writer: W,
}

impl SetupFile<AtomicFileWriter> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W: StateFileWriter> SetupFile<W> {
    /// Create a setup file with a custom writer
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    // =========================================================================
    // Loading and Schema Gate
    // =========================================================================

    /// Read the setup file into the context unless already cached
    ///
    /// A missing or unreadable file leaves the context empty: a first run has
    /// no file yet and setup creates one.
    pub fn load_schema(&self, ctx: &mut SetupContext) {
        if ctx.is_loaded() {
            return;
        }

        let path = ctx.config().setup_file_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No readable setup file at {}: {}", path.display(), e);
                return;
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(document)) => {
                debug!("Loaded setup file {}", path.display());
                ctx.set_document(document);
            }
            Ok(_) => warn!(
                "Setup file {} does not contain a JSON object, ignoring it",
                path.display()
            ),
            Err(e) => warn!("Failed to parse setup file {}: {}", path.display(), e),
        }
    }

    /// Compare stored state against the live configuration
    pub fn schema_status(&self, ctx: &SetupContext) -> SchemaStatus {
        if ctx.runtime().is_trusted() {
            return SchemaStatus::Good;
        }

        let Some(stored_key) = self.get(ctx, UPGRADE_KEY) else {
            return SchemaStatus::Missing;
        };

        if self.maintenance_flag_set(ctx) {
            return SchemaStatus::Maintenance;
        }

        if stored_key.as_str() != Some(make_upgrade_key(ctx.config()).as_str()) {
            return SchemaStatus::KeyMismatch;
        }

        SchemaStatus::Good
    }

    /// Whether storage code may run against the current schema
    pub fn is_good_schema(&self, ctx: &SetupContext) -> bool {
        self.schema_status(ctx).is_good()
    }

    // =========================================================================
    // Maintenance Mode
    // =========================================================================

    /// Whether an upgrade is in progress; CLI runs are never blocked
    pub fn in_maintenance_mode(&self, ctx: &SetupContext) -> bool {
        if ctx.runtime() == Runtime::Cli {
            return false;
        }

        self.maintenance_flag_set(ctx)
    }

    /// Raw maintenance value of this installation
    pub fn maintenance_mode<'a>(&self, ctx: &'a SetupContext) -> Option<&'a Value> {
        self.get(ctx, MAINTENANCE_MODE)
    }

    /// Enter (or update) maintenance mode and stamp the current upgrade key
    pub fn set_maintenance_mode(&self, ctx: &mut SetupContext, mode: Value) -> Result<()> {
        let key = make_upgrade_key(ctx.config());
        info!("Setting maintenance mode to {}", mode);

        self.write(
            ctx,
            changes([(UPGRADE_KEY, Value::from(key)), (MAINTENANCE_MODE, mode)]),
        )
    }

    /// Leave maintenance mode and mark the current upgrade key authoritative
    ///
    /// Returns `false` when nothing had to be written.
    pub fn finalize(&self, ctx: &mut SetupContext) -> Result<bool> {
        self.ensure_loaded(ctx)?;
        let key = make_upgrade_key(ctx.config());

        let up_to_date = self.get(ctx, UPGRADE_KEY).and_then(Value::as_str) == Some(key.as_str())
            && self.get(ctx, MAINTENANCE_MODE) == Some(&Value::Bool(false));

        if up_to_date {
            debug!("Setup file already finalized");
            return Ok(false);
        }

        self.write(
            ctx,
            changes([
                (UPGRADE_KEY, Value::from(key)),
                (MAINTENANCE_MODE, Value::Bool(false)),
            ]),
        )?;

        info!(
            "Finalized setup for installation '{}'",
            ctx.config().installation_id
        );
        Ok(true)
    }

    /// Clear the state of this installation, forcing a full setup run
    pub fn reset(&self, ctx: &mut SetupContext) -> Result<()> {
        self.ensure_loaded(ctx)?;

        let id = &ctx.config().installation_id;
        if !ctx.document().is_some_and(|document| document.contains_key(id)) {
            return Ok(());
        }

        let mut document = ctx.document().cloned().unwrap_or_default();
        document.insert(
            ctx.config().installation_id.clone(),
            Value::Object(Map::new()),
        );

        info!(
            "Reset setup state for installation '{}'",
            ctx.config().installation_id
        );
        self.persist(ctx, document)
    }

    // =========================================================================
    // Generic Accessors
    // =========================================================================

    /// Value stored under `key` for this installation
    pub fn get<'a>(&self, ctx: &'a SetupContext, key: &str) -> Option<&'a Value> {
        ctx.installation()?.get(key).filter(|v| !v.is_null())
    }

    /// Merge values into this installation's state; `null` removes a key
    pub fn set(&self, ctx: &mut SetupContext, values: Map<String, Value>) -> Result<()> {
        self.write(ctx, values)
    }

    pub fn remove(&self, ctx: &mut SetupContext, key: &str) -> Result<()> {
        self.write(ctx, changes([(key, Value::Null)]))
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Track install versus upgrade
    ///
    /// The first recorded version only sets the latest version. A different
    /// version moves the latest version to the previous one.
    pub fn set_latest_version(&self, ctx: &mut SetupContext, version: &str) -> Result<()> {
        self.ensure_loaded(ctx)?;
        let latest = self.get(ctx, LATEST_VERSION).cloned();
        let previous = self.get(ctx, PREVIOUS_VERSION);
        let version = Value::from(version);

        if latest.is_none() && previous.is_none() {
            info!("Recording first installed version {}", version);
            return self.write(ctx, changes([(LATEST_VERSION, version)]));
        }

        if latest.as_ref() == Some(&version) {
            return Ok(());
        }

        let from = latest.clone().unwrap_or(Value::Null);
        info!("Upgrade detected: {} -> {}", from, version);
        self.write(
            ctx,
            changes([
                (LATEST_VERSION, version),
                (PREVIOUS_VERSION, latest.unwrap_or(Value::Null)),
            ]),
        )
    }

    pub fn latest_version<'a>(&self, ctx: &'a SetupContext) -> Option<&'a str> {
        self.get(ctx, LATEST_VERSION)?.as_str()
    }

    pub fn previous_version<'a>(&self, ctx: &'a SetupContext) -> Option<&'a str> {
        self.get(ctx, PREVIOUS_VERSION)?.as_str()
    }

    /// Whether the recorded versions describe an upgrade rather than an install
    pub fn is_upgrade(&self, ctx: &SetupContext) -> bool {
        matches!(
            (self.latest_version(ctx), self.previous_version(ctx)),
            (Some(latest), Some(previous)) if latest != previous
        )
    }

    // =========================================================================
    // Incomplete Tasks
    // =========================================================================

    /// Register a task without arguments
    pub fn add_incomplete_task(&self, ctx: &mut SetupContext, key: &str) -> Result<()> {
        self.add_incomplete_task_with_args(ctx, key, &[])
    }

    /// Register a task; empty arguments are stored as `true`
    pub fn add_incomplete_task_with_args(
        &self,
        ctx: &mut SetupContext,
        key: &str,
        args: &[&str],
    ) -> Result<()> {
        self.ensure_loaded(ctx)?;
        let mut tasks = self.incomplete_tasks(ctx);

        let value = if args.is_empty() {
            Value::Bool(true)
        } else {
            Value::Array(args.iter().map(|arg| Value::from(*arg)).collect())
        };
        tasks.insert(key.to_string(), value);

        debug!("Adding incomplete task '{}'", key);
        self.write(ctx, changes([(INCOMPLETE_TASKS, Value::Object(tasks))]))
    }

    pub fn remove_incomplete_task(&self, ctx: &mut SetupContext, key: &str) -> Result<()> {
        self.ensure_loaded(ctx)?;
        let mut tasks = self.incomplete_tasks(ctx);
        tasks.remove(key);

        debug!("Removing incomplete task '{}'", key);
        self.write(ctx, changes([(INCOMPLETE_TASKS, Value::Object(tasks))]))
    }

    /// Completion flags still `false`, followed by registered tasks
    pub fn find_incomplete_tasks(&self, ctx: &SetupContext) -> Vec<IncompleteTask> {
        let mut tasks: Vec<IncompleteTask> = COMPLETION_CHECKS
            .iter()
            .filter(|(key, _)| self.get(ctx, key) == Some(&Value::Bool(false)))
            .map(|(_, message)| IncompleteTask::Key(message.to_string()))
            .collect();

        for (key, args) in self.incomplete_tasks(ctx) {
            let task = match args {
                Value::Bool(true) => IncompleteTask::Key(key),
                Value::Array(args) => {
                    IncompleteTask::WithArgs(key, args.iter().map(arg_to_string).collect())
                }
                other => IncompleteTask::WithArgs(key, vec![arg_to_string(&other)]),
            };
            tasks.push(task);
        }

        tasks
    }

    // =========================================================================
    // Database Requirements
    // =========================================================================

    pub fn set_database_requirements(
        &self,
        ctx: &mut SetupContext,
        requirements: &DatabaseRequirements,
    ) -> Result<()> {
        self.write(
            ctx,
            changes([(DB_REQUIREMENTS, serde_json::to_value(requirements)?)]),
        )
    }

    pub fn database_requirements(&self, ctx: &SetupContext) -> Option<DatabaseRequirements> {
        serde_json::from_value(self.get(ctx, DB_REQUIREMENTS)?.clone()).ok()
    }

    /// Whether the database meets the minimum version
    ///
    /// No (or an incomplete) record means nothing has been checked yet.
    pub fn has_database_min_requirement(&self, ctx: &SetupContext) -> bool {
        match self.database_requirements(ctx) {
            Some(requirements) => {
                version_at_least(&requirements.latest_version, &requirements.minimum_version)
            }
            None => true,
        }
    }

    // =========================================================================
    // Table Optimization
    // =========================================================================

    pub fn set_last_optimization_run(
        &self,
        ctx: &mut SetupContext,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.write(
            ctx,
            changes([(LAST_OPTIMIZATION_RUN, json!(timestamp.to_rfc3339()))]),
        )
    }

    pub fn last_optimization_run(&self, ctx: &SetupContext) -> Option<DateTime<Utc>> {
        let timestamp = self.get(ctx, LAST_OPTIMIZATION_RUN)?.as_str()?;
        DateTime::parse_from_rfc3339(timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Merge `values` into this installation's entry and persist the document
    ///
    /// Other installations are left untouched. The context is only updated
    /// once the file has been written.
    pub fn write(&self, ctx: &mut SetupContext, values: Map<String, Value>) -> Result<()> {
        self.ensure_loaded(ctx)?;

        let id = ctx.config().installation_id.clone();
        let mut document = ctx.document().cloned().unwrap_or_default();

        let adds_values = values.values().any(|v| !v.is_null());

        if adds_values || document.contains_key(&id) {
            let entry = document
                .entry(id)
                .or_insert_with(|| Value::Object(Map::new()));

            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }

            if let Value::Object(state) = entry {
                for (key, value) in values {
                    if value.is_null() {
                        state.remove(&key);
                    } else {
                        state.insert(key, value);
                    }
                }
            }
        }

        self.persist(ctx, document)
    }

    /// Load the document before rewriting it
    ///
    /// A file that exists but cannot be loaded holds entries of other
    /// installations, so it is never overwritten.
    fn ensure_loaded(&self, ctx: &mut SetupContext) -> Result<()> {
        self.load_schema(ctx);

        let path = ctx.config().setup_file_path();
        if !ctx.is_loaded() && path.exists() {
            return Err(SetupError::Unreadable { path });
        }

        Ok(())
    }

    fn persist(&self, ctx: &mut SetupContext, mut document: Map<String, Value>) -> Result<()> {
        document.remove(LEGACY_UPGRADE_KEY);
        if let Some(Value::Object(state)) = document.get_mut(&ctx.config().installation_id) {
            state.remove(LEGACY_MAINTENANCE_MODE);
        }

        let path = ctx.config().setup_file_path();
        let content = serde_json::to_string_pretty(&document)?;
        self.writer.write(&path, &content)?;

        ctx.set_document(document);
        Ok(())
    }

    fn maintenance_flag_set(&self, ctx: &SetupContext) -> bool {
        self.get(ctx, MAINTENANCE_MODE)
            .is_some_and(|mode| *mode != Value::Bool(false))
    }

    fn incomplete_tasks(&self, ctx: &SetupContext) -> Map<String, Value> {
        self.get(ctx, INCOMPLETE_TASKS)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

fn changes<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn arg_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
