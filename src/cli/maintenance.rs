//! Maintenance CLI commands

use crate::state::SetupFile;
use crate::{Result, SetupContext};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// Enter maintenance mode (blocks storage operations for web requests)
    On {
        /// JSON value describing the running upgrade (default: true)
        value: Option<String>,
    },

    /// Leave maintenance mode without finalizing the upgrade key
    Off,
}

pub fn run(setup_file: &SetupFile, ctx: &mut SetupContext, cmd: MaintenanceCommands) -> Result<()> {
    match cmd {
        MaintenanceCommands::On { value } => {
            let mode = match value {
                Some(raw) => parse_value(&raw)?,
                None => Value::Bool(true),
            };

            if mode == Value::Bool(false) {
                anyhow::bail!("Use 'maintenance off' to leave maintenance mode");
            }

            setup_file.set_maintenance_mode(ctx, mode)?;
            println!("{}", "🔨 Maintenance mode enabled".blue());
        }

        MaintenanceCommands::Off => {
            setup_file.set_maintenance_mode(ctx, Value::Bool(false))?;
            println!("{}", "✅ Maintenance mode disabled".green());
        }
    }

    Ok(())
}

/// Mark the current configuration as the installed schema
pub fn finalize(setup_file: &SetupFile, ctx: &mut SetupContext) -> Result<()> {
    if setup_file.finalize(ctx)? {
        println!("{}", "✅ Setup finalized".green());
    } else {
        println!("{}", "Setup already up to date".bright_black());
    }
    Ok(())
}

/// Drop all state of this installation
pub fn reset(setup_file: &SetupFile, ctx: &mut SetupContext) -> Result<()> {
    setup_file.reset(ctx)?;
    println!(
        "{}",
        format!(
            "🧹 Setup state cleared for '{}'; run the installer to rebuild",
            ctx.config().installation_id
        )
        .yellow()
    );
    Ok(())
}

/// Parse a JSON value, accepting bare words as strings
pub fn parse_value(raw: &str) -> Result<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(_) if !raw.trim().is_empty() => Ok(Value::String(raw.to_string())),
        Err(e) => Err(anyhow::anyhow!("Invalid value '{}': {}", raw, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Runtime;
    use crate::SetupConfig;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true").unwrap(), json!(true));
        assert_eq!(parse_value("{\"step\": 2}").unwrap(), json!({ "step": 2 }));
        assert_eq!(parse_value("rebuild").unwrap(), json!("rebuild"));
        assert!(parse_value("  ").is_err());
    }

    #[test]
    fn test_maintenance_on_off() {
        let temp_dir = TempDir::new().unwrap();
        let config = SetupConfig {
            config_dir: temp_dir.path().to_path_buf(),
            ..SetupConfig::default()
        };
        let mut ctx = SetupContext::new(config, Runtime::Request);
        let setup_file = SetupFile::new();

        run(&setup_file, &mut ctx, MaintenanceCommands::On { value: None }).unwrap();
        assert!(setup_file.in_maintenance_mode(&ctx));

        assert!(run(
            &setup_file,
            &mut ctx,
            MaintenanceCommands::On {
                value: Some("false".to_string())
            }
        )
        .is_err());

        run(&setup_file, &mut ctx, MaintenanceCommands::Off).unwrap();
        assert!(!setup_file.in_maintenance_mode(&ctx));
        assert!(setup_file.is_good_schema(&ctx));
    }
}
