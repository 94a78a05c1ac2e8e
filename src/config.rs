//! Setup configuration
//!
//! Holds the location of the setup file and every setting that decides the
//! shape of the database tables. Only these settings feed the upgrade key.

use crate::state::{Result, SetupError, FILE_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "smw-setup.toml";

/// Field type feature flags (bit set, `0` means no feature enabled)
pub const FIELDT_NONE: u32 = 0;
pub const FIELDT_CHAR_NOCASE: u32 = 2;
pub const FIELDT_CHAR_LONG: u32 = 4;

// =============================================================================
// Setup Configuration
// =============================================================================

/// Configuration consumed by the setup file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Directory holding `.smw.json`; must be persistent and writable
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Identifier of the wiki instance (partitions the setup file)
    #[serde(default = "default_installation_id")]
    pub installation_id: String,

    /// Seed mixed into the upgrade key; bump to force a schema update
    #[serde(default = "default_upgrade_key_seed")]
    pub upgrade_key_seed: String,

    /// Storage backend identifier
    #[serde(default = "default_store")]
    pub default_store: String,

    /// User-defined properties with their own table
    #[serde(default)]
    pub fixed_properties: Vec<String>,

    /// Enabled special properties
    #[serde(default = "default_page_special_properties")]
    pub page_special_properties: Vec<String>,

    /// Special properties that require a fixed table when enabled
    #[serde(default = "default_fixed_table_properties")]
    pub fixed_table_properties: Vec<String>,

    /// Full-text search toggle
    #[serde(default)]
    pub enabled_fulltext_search: bool,

    /// Field type feature flags (see `FIELDT_*`)
    #[serde(default)]
    pub field_type_features: u32,

    /// Minimum database version per backend
    #[serde(default = "default_minimum_db_version")]
    pub minimum_db_version: BTreeMap<String, String>,
}

fn default_config_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_installation_id() -> String {
    "wiki".to_string()
}

fn default_upgrade_key_seed() -> String {
    "smw:2019-02-25".to_string()
}

fn default_store() -> String {
    "SMW\\SQLStore\\SQLStore".to_string()
}

fn default_page_special_properties() -> Vec<String> {
    vec!["_MDAT".to_string()]
}

fn default_fixed_table_properties() -> Vec<String> {
    ["_MDAT", "_CDAT", "_NEWP", "_LEDT", "_MIME", "_MEDIA", "_ATTCH_LINK"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_minimum_db_version() -> BTreeMap<String, String> {
    [("mysql", "5.5.8"), ("postgres", "9.5.0"), ("sqlite", "3.3.7")]
        .iter()
        .map(|(backend, version)| (backend.to_string(), version.to_string()))
        .collect()
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            installation_id: default_installation_id(),
            upgrade_key_seed: default_upgrade_key_seed(),
            default_store: default_store(),
            fixed_properties: Vec::new(),
            page_special_properties: default_page_special_properties(),
            fixed_table_properties: default_fixed_table_properties(),
            enabled_fulltext_search: false,
            field_type_features: FIELDT_NONE,
            minimum_db_version: default_minimum_db_version(),
        }
    }
}

impl SetupConfig {
    /// Load config from a TOML file, falling back to defaults when missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: SetupConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Location of the setup file
    pub fn setup_file_path(&self) -> PathBuf {
        self.config_dir.join(FILE_NAME)
    }

    /// Enabled special properties that require a fixed table
    pub fn fixed_table_special_properties(&self) -> Vec<String> {
        self.page_special_properties
            .iter()
            .filter(|p| self.fixed_table_properties.contains(p))
            .cloned()
            .collect()
    }

    /// Reject settings that cannot produce a usable setup file
    pub fn validate(&self) -> Result<()> {
        if self.installation_id.trim().is_empty() {
            return Err(SetupError::InvalidValue(
                "installation_id must not be empty".to_string(),
            ));
        }

        if self.config_dir.as_os_str().is_empty() {
            return Err(SetupError::InvalidValue(
                "config_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = SetupConfig::load(&temp_dir.path().join(CONFIG_FILE_NAME)).unwrap();

        assert_eq!(config, SetupConfig::default());
        assert_eq!(config.installation_id, "wiki");
        assert_eq!(config.minimum_db_version.get("sqlite").unwrap(), "3.3.7");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "installation_id = \"mw-de\"\nfixed_properties = [\"Foo\", \"Bar\"]\nenabled_fulltext_search = true\n",
        )
        .unwrap();

        let config = SetupConfig::load(&path).unwrap();
        assert_eq!(config.installation_id, "mw-de");
        assert_eq!(config.fixed_properties, vec!["Foo", "Bar"]);
        assert!(config.enabled_fulltext_search);
        assert_eq!(config.default_store, default_store());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join(CONFIG_FILE_NAME);

        let config = SetupConfig {
            installation_id: "site-a".to_string(),
            field_type_features: FIELDT_CHAR_NOCASE | FIELDT_CHAR_LONG,
            ..SetupConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(SetupConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "installation_id = [").unwrap();

        assert!(matches!(
            SetupConfig::load(&path),
            Err(SetupError::Config(_))
        ));
    }

    #[test]
    fn test_fixed_table_special_properties() {
        let config = SetupConfig {
            page_special_properties: vec![
                "_MDAT".to_string(),
                "_SKEY".to_string(),
                "_CDAT".to_string(),
            ],
            ..SetupConfig::default()
        };

        assert_eq!(config.fixed_table_special_properties(), vec!["_MDAT", "_CDAT"]);
    }

    #[test]
    fn test_validate() {
        assert!(SetupConfig::default().validate().is_ok());

        let config = SetupConfig {
            installation_id: " ".to_string(),
            ..SetupConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
