//! Upgrade key computation
//!
//! The key fingerprints the settings that influence the shape of the tables.
//! A changed key means the stored schema no longer matches the configuration.

use crate::config::SetupConfig;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Key under which non-default field type features join the key base
const FIELD_TYPE_FEATURES: &str = "field_type_features";

/// Compute the upgrade key for a configuration
///
/// Returns the hex encoded SHA-256 of [`upgrade_key_base`].
pub fn make_upgrade_key(config: &SetupConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(upgrade_key_base(config).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonical JSON serialization of the schema shaping settings
///
/// Property lists are sorted so the same settings in a different order give
/// the same key. Object keys are emitted in sorted order.
pub fn upgrade_key_base(config: &SetupConfig) -> String {
    let mut fixed_properties = config.fixed_properties.clone();
    fixed_properties.sort();

    // Only special properties with a fixed table change the table layout
    let mut special_properties = config.fixed_table_special_properties();
    special_properties.sort();

    let mut components = Map::new();
    components.insert("0".to_string(), json!(config.upgrade_key_seed));
    components.insert("1".to_string(), json!(config.default_store));
    components.insert("2".to_string(), json!(fixed_properties));
    components.insert("3".to_string(), json!(config.enabled_fulltext_search));
    components.insert("4".to_string(), json!(special_properties));

    if config.field_type_features != 0 {
        components.insert(
            FIELD_TYPE_FEATURES.to_string(),
            json!(config.field_type_features),
        );
    }

    // A changed version floor forces an update so requirements get rechecked
    for (backend, version) in &config.minimum_db_version {
        components
            .entry(backend.clone())
            .or_insert_with(|| json!(version));
    }

    Value::Object(components).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FIELDT_CHAR_NOCASE;

    fn config() -> SetupConfig {
        SetupConfig {
            fixed_properties: vec!["Has date".to_string(), "Has area".to_string()],
            page_special_properties: vec!["_MDAT".to_string(), "_CDAT".to_string()],
            ..SetupConfig::default()
        }
    }

    #[test]
    fn test_key_is_stable() {
        let key = make_upgrade_key(&config());
        assert_eq!(key, make_upgrade_key(&config()));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_list_order_does_not_matter() {
        let mut reordered = config();
        reordered.fixed_properties.reverse();
        reordered.page_special_properties.reverse();

        assert_eq!(make_upgrade_key(&config()), make_upgrade_key(&reordered));
    }

    #[test]
    fn test_schema_shaping_settings_change_key() {
        let base = make_upgrade_key(&config());

        let mut changed = config();
        changed.default_store = "SMW\\Elastic\\ElasticStore".to_string();
        assert_ne!(base, make_upgrade_key(&changed));

        let mut changed = config();
        changed.fixed_properties.push("Has population".to_string());
        assert_ne!(base, make_upgrade_key(&changed));

        let mut changed = config();
        changed.enabled_fulltext_search = true;
        assert_ne!(base, make_upgrade_key(&changed));

        let mut changed = config();
        changed.field_type_features = FIELDT_CHAR_NOCASE;
        assert_ne!(base, make_upgrade_key(&changed));

        let mut changed = config();
        changed.upgrade_key_seed = "smw:2020-01-01".to_string();
        assert_ne!(base, make_upgrade_key(&changed));

        let mut changed = config();
        changed
            .minimum_db_version
            .insert("mysql".to_string(), "5.7.0".to_string());
        assert_ne!(base, make_upgrade_key(&changed));
    }

    #[test]
    fn test_special_properties_without_fixed_table_are_ignored() {
        let mut changed = config();
        changed.page_special_properties.push("_SKEY".to_string());

        assert_eq!(make_upgrade_key(&config()), make_upgrade_key(&changed));
    }

    #[test]
    fn test_key_base_layout() {
        let base = upgrade_key_base(&config());
        let value: Value = serde_json::from_str(&base).unwrap();

        assert_eq!(value["2"], json!(["Has area", "Has date"]));
        assert_eq!(value["4"], json!(["_CDAT", "_MDAT"]));
        assert_eq!(value["sqlite"], json!("3.3.7"));
        assert!(value.get(FIELD_TYPE_FEATURES).is_none());
    }
}
