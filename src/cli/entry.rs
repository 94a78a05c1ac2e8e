//! Raw setup entry commands

use crate::cli::maintenance::parse_value;
use crate::state::{DatabaseRequirements, SetupFile};
use crate::{Result, SetupContext};
use chrono::Utc;
use colored::Colorize;
use serde_json::Map;

/// Print a stored value
pub fn get(setup_file: &SetupFile, ctx: &SetupContext, key: &str) -> Result<()> {
    match setup_file.get(ctx, key) {
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => println!("{}", "null".bright_black()),
    }
    Ok(())
}

/// Store a value; `null` removes the key
pub fn set(setup_file: &SetupFile, ctx: &mut SetupContext, key: &str, raw: &str) -> Result<()> {
    let mut values = Map::new();
    values.insert(key.to_string(), parse_value(raw)?);
    setup_file.set(ctx, values)?;
    println!("{}", format!("Updated '{}'", key).green());
    Ok(())
}

pub fn remove(setup_file: &SetupFile, ctx: &mut SetupContext, key: &str) -> Result<()> {
    setup_file.remove(ctx, key)?;
    println!("{}", format!("Removed '{}'", key).green());
    Ok(())
}

/// Record the installed software version
pub fn set_version(setup_file: &SetupFile, ctx: &mut SetupContext, version: &str) -> Result<()> {
    setup_file.set_latest_version(ctx, version)?;

    match setup_file.previous_version(ctx) {
        Some(previous) if setup_file.is_upgrade(ctx) => {
            println!("{}", format!("📦 Upgrade: {} → {}", previous, version).cyan())
        }
        _ => println!("{}", format!("Version: {}", version).cyan()),
    }
    Ok(())
}

/// Record the database version and the supported minimum
pub fn db_requirements(
    setup_file: &SetupFile,
    ctx: &mut SetupContext,
    latest: &str,
    minimum: &str,
) -> Result<()> {
    let requirements = DatabaseRequirements {
        latest_version: latest.to_string(),
        minimum_version: minimum.to_string(),
    };
    setup_file.set_database_requirements(ctx, &requirements)?;

    if setup_file.has_database_min_requirement(ctx) {
        println!("{}", "✅ Database meets the minimum version".green());
    } else {
        println!(
            "{}",
            format!("⚠️  Database {} is below the minimum {}", latest, minimum).red()
        );
    }
    Ok(())
}

/// Stamp the table optimization run
pub fn optimized(setup_file: &SetupFile, ctx: &mut SetupContext) -> Result<()> {
    let now = Utc::now();
    setup_file.set_last_optimization_run(ctx, now)?;
    println!(
        "{}",
        format!("Recorded optimization run at {}", now.format("%Y-%m-%d %H:%M:%S")).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Runtime;
    use crate::SetupConfig;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let config = SetupConfig {
            config_dir: temp_dir.path().to_path_buf(),
            ..SetupConfig::default()
        };
        let mut ctx = SetupContext::new(config, Runtime::Cli);
        let setup_file = SetupFile::new();

        set(&setup_file, &mut ctx, "foo", "[1, 2]").unwrap();
        assert!(setup_file.get(&ctx, "foo").is_some());

        set(&setup_file, &mut ctx, "foo", "null").unwrap();
        assert!(setup_file.get(&ctx, "foo").is_none());

        set(&setup_file, &mut ctx, "bar", "baz").unwrap();
        remove(&setup_file, &mut ctx, "bar").unwrap();
        assert!(setup_file.get(&ctx, "bar").is_none());
    }
}
