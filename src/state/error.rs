use std::path::PathBuf;

/// Result type for setup file operations
pub type Result<T> = std::result::Result<T, SetupError>;

/// Errors that can occur when working with the setup file
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The setup file could not be persisted; callers must not continue
    #[error("Unable to write the setup file {}: {source}", .path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The setup file exists but could not be loaded, so it is left alone
    #[error(
        "Refusing to overwrite the setup file {}: it exists but could not be loaded; repair or remove it",
        .path.display()
    )]
    Unreadable { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize setup state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl SetupError {
    /// Whether this error must halt the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, SetupError::NotWritable { .. })
    }
}
