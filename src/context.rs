use crate::config::SetupConfig;
use serde_json::{Map, Value};

/// How the current process is running
///
/// CLI and test runs are trusted: they are the ones performing setup, so they
/// are never blocked by the schema gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// Regular web request
    Request,
    /// Command line maintenance run
    Cli,
    /// Test harness
    Test,
}

impl Runtime {
    /// Whether the schema gate is skipped
    pub fn is_trusted(self) -> bool {
        !matches!(self, Runtime::Request)
    }
}

/// Context threaded through every setup file operation
///
/// Owns the configuration and the cached setup document, which is read at
/// most once per context.
#[derive(Debug, Clone)]
pub struct SetupContext {
    config: SetupConfig,
    runtime: Runtime,
    document: Option<Map<String, Value>>,
}

impl SetupContext {
    pub fn new(config: SetupConfig, runtime: Runtime) -> Self {
        Self {
            config,
            runtime,
            document: None,
        }
    }

    /// Seed the cache with an already parsed document
    pub fn with_document(mut self, document: Map<String, Value>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    /// Whether the setup document has been cached
    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// The whole cached document (all installations)
    pub fn document(&self) -> Option<&Map<String, Value>> {
        self.document.as_ref()
    }

    /// State entry of the current installation
    pub fn installation(&self) -> Option<&Map<String, Value>> {
        self.document
            .as_ref()?
            .get(&self.config.installation_id)?
            .as_object()
    }

    pub(crate) fn set_document(&mut self, document: Map<String, Value>) {
        self.document = Some(document);
    }
}
