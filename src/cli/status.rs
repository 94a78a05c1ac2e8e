use crate::bootstrap::schema_notice;
use crate::state::{make_upgrade_key, IncompleteTask, SchemaStatus, SetupFile, UPGRADE_KEY};
use crate::{Result, SetupContext};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

/// Snapshot of the setup state of one installation
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub installation_id: String,
    pub schema_status: SchemaStatus,
    pub upgrade_key: String,
    pub stored_upgrade_key: Option<String>,
    pub maintenance_mode: Option<Value>,
    pub latest_version: Option<String>,
    pub previous_version: Option<String>,
    pub database_requirement_met: bool,
    pub last_optimization_run: Option<String>,
    pub incomplete_tasks: Vec<IncompleteTask>,
}

pub fn build_report(setup_file: &SetupFile, ctx: &SetupContext) -> StatusReport {
    StatusReport {
        installation_id: ctx.config().installation_id.clone(),
        schema_status: setup_file.schema_status(ctx),
        upgrade_key: make_upgrade_key(ctx.config()),
        stored_upgrade_key: setup_file
            .get(ctx, UPGRADE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string),
        maintenance_mode: setup_file.maintenance_mode(ctx).cloned(),
        latest_version: setup_file.latest_version(ctx).map(str::to_string),
        previous_version: setup_file.previous_version(ctx).map(str::to_string),
        database_requirement_met: setup_file.has_database_min_requirement(ctx),
        last_optimization_run: setup_file
            .last_optimization_run(ctx)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        incomplete_tasks: setup_file.find_incomplete_tasks(ctx),
    }
}

/// Print the setup state
pub fn run(setup_file: &SetupFile, ctx: &SetupContext, json: bool) -> Result<()> {
    let report = build_report(setup_file, ctx);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Setup status for: {}", report.installation_id)
            .cyan()
            .bold()
    );
    println!();

    let status = match report.schema_status {
        SchemaStatus::Good => "✅ good".green(),
        SchemaStatus::Missing => "❔ missing".yellow(),
        SchemaStatus::KeyMismatch => "⚠️  key mismatch".red(),
        SchemaStatus::Maintenance => "🔨 maintenance".blue(),
    };

    println!("   Schema:       {}", status);
    println!("   Upgrade key:  {}", report.upgrade_key);
    if let Some(stored) = &report.stored_upgrade_key {
        println!("   Stored key:   {}", stored);
    }
    if let Some(mode) = &report.maintenance_mode {
        println!("   Maintenance:  {}", mode);
    }
    if let Some(latest) = &report.latest_version {
        println!("   Version:      {}", latest);
    }
    if let Some(previous) = &report.previous_version {
        println!("   Previous:     {}", previous.bright_black());
    }
    if let Some(optimized) = &report.last_optimization_run {
        println!("   Optimized:    {}", optimized);
    }

    if report.database_requirement_met {
        println!("   Database:     {}", "meets minimum version".green());
    } else {
        println!("   Database:     {}", "below minimum version".red());
    }

    if !report.incomplete_tasks.is_empty() {
        println!();
        println!("{}", "Incomplete tasks:".yellow());
        print_tasks(&report.incomplete_tasks);
    }

    if let Some(notice) = schema_notice(report.schema_status) {
        println!();
        println!("{}", format!("💡 {}", notice).yellow());
    }

    Ok(())
}

/// Gate check; fails with the operator notice unless the schema is good
pub fn check(setup_file: &SetupFile, ctx: &SetupContext) -> Result<()> {
    let status = setup_file.schema_status(ctx);

    if let Some(notice) = schema_notice(status) {
        anyhow::bail!(notice);
    }

    println!("{}", "✅ Schema matches the current configuration".green());
    Ok(())
}

/// Print the upgrade key of the loaded configuration
pub fn upgrade_key(ctx: &SetupContext, base: bool) {
    if base {
        println!("{}", crate::state::upgrade_key_base(ctx.config()));
    } else {
        println!("{}", make_upgrade_key(ctx.config()));
    }
}

pub fn print_tasks(tasks: &[IncompleteTask]) {
    for task in tasks {
        match task {
            IncompleteTask::Key(key) => println!("  • {}", key),
            IncompleteTask::WithArgs(key, args) => {
                println!("  • {} {}", key, format!("({})", args.join(", ")).bright_black())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Runtime;
    use crate::SetupConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup_context() -> (TempDir, SetupContext) {
        let temp_dir = TempDir::new().unwrap();
        let config = SetupConfig {
            config_dir: temp_dir.path().to_path_buf(),
            ..SetupConfig::default()
        };
        (temp_dir, SetupContext::new(config, Runtime::Request))
    }

    #[test]
    fn test_report_for_fresh_installation() {
        let (_temp, ctx) = setup_context();
        let report = build_report(&SetupFile::new(), &ctx);

        assert_eq!(report.schema_status, SchemaStatus::Missing);
        assert!(report.stored_upgrade_key.is_none());
        assert!(report.database_requirement_met);
        assert!(report.incomplete_tasks.is_empty());
        assert!(check(&SetupFile::new(), &ctx).is_err());
    }

    #[test]
    fn test_report_after_setup() {
        let (_temp, mut ctx) = setup_context();
        let setup_file = SetupFile::new();

        setup_file.set_latest_version(&mut ctx, "4.1.0").unwrap();
        setup_file
            .add_incomplete_task_with_args(&mut ctx, "smw-rebuild", &["--force"])
            .unwrap();
        setup_file.finalize(&mut ctx).unwrap();

        let report = build_report(&setup_file, &ctx);
        assert_eq!(report.schema_status, SchemaStatus::Good);
        assert_eq!(report.stored_upgrade_key, Some(report.upgrade_key.clone()));
        assert_eq!(report.maintenance_mode, Some(json!(false)));
        assert_eq!(report.latest_version.as_deref(), Some("4.1.0"));
        assert!(check(&setup_file, &ctx).is_ok());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["schema_status"], json!("good"));
        assert_eq!(value["incomplete_tasks"], json!([["smw-rebuild", ["--force"]]]));
    }
}
