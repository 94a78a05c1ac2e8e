use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use smw_setup::bootstrap::{abort_on_persistence_failure, bootstrap};
use smw_setup::cli::{entry, maintenance, status, task};
use smw_setup::config::CONFIG_FILE_NAME;
use smw_setup::{Context, Result, Runtime, SetupConfig, SetupError};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "smw-setup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and maintain the Semantic MediaWiki setup file", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Increase logging verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },

    #[command(flatten)]
    Setup(SetupCommands),
}

/// Commands operating on the setup file
#[derive(Subcommand)]
enum SetupCommands {
    /// Show the setup state of the installation
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Exit with an error unless web requests may use the schema
    Check,

    /// Print the upgrade key of the current configuration
    UpgradeKey {
        /// Print the serialized settings instead of the hash
        #[arg(long)]
        base: bool,
    },

    /// Maintenance mode operations
    #[command(subcommand)]
    Maintenance(maintenance::MaintenanceCommands),

    /// Leave maintenance mode and record the current upgrade key
    Finalize,

    /// Clear the setup state of this installation
    Reset,

    /// Incomplete task operations
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Print a stored value
    Get {
        key: String,
    },

    /// Store a JSON value (`null` removes the key)
    Set {
        key: String,
        value: String,
    },

    /// Remove a stored value
    Remove {
        key: String,
    },

    /// Record the installed software version
    SetVersion {
        #[arg(id = "installed_version", value_name = "VERSION")]
        version: String,
    },

    /// Record the database server version and the supported minimum
    DbRequirements {
        latest: String,
        minimum: String,
    },

    /// Record a table optimization run
    Optimized,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        if let Some(setup_err) = e.downcast_ref::<SetupError>() {
            if setup_err.is_fatal() {
                abort_on_persistence_failure(setup_err);
            }
        }

        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "smw-setup", &mut io::stdout());
            Ok(())
        }
        Commands::Setup(command) => run_setup(command, &cli.config),
    }
}

fn run_setup(command: SetupCommands, config_path: &Path) -> Result<()> {
    let config = SetupConfig::load(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    config.validate()?;

    // Report what a web request would see; the CLI itself is never gated
    let (setup_file, mut ctx) = bootstrap(config, Runtime::Request);

    match command {
        SetupCommands::Status { json } => status::run(&setup_file, &ctx, json)?,
        SetupCommands::Check => status::check(&setup_file, &ctx)?,
        SetupCommands::UpgradeKey { base } => status::upgrade_key(&ctx, base),
        SetupCommands::Maintenance(cmd) => maintenance::run(&setup_file, &mut ctx, cmd)?,
        SetupCommands::Finalize => maintenance::finalize(&setup_file, &mut ctx)?,
        SetupCommands::Reset => maintenance::reset(&setup_file, &mut ctx)?,
        SetupCommands::Task(cmd) => task::run(&setup_file, &mut ctx, cmd)?,
        SetupCommands::Get { key } => entry::get(&setup_file, &ctx, &key)?,
        SetupCommands::Set { key, value } => entry::set(&setup_file, &mut ctx, &key, &value)?,
        SetupCommands::Remove { key } => entry::remove(&setup_file, &mut ctx, &key)?,
        SetupCommands::SetVersion { version } => entry::set_version(&setup_file, &mut ctx, &version)?,
        SetupCommands::DbRequirements { latest, minimum } => {
            entry::db_requirements(&setup_file, &mut ctx, &latest, &minimum)?
        }
        SetupCommands::Optimized => entry::optimized(&setup_file, &mut ctx)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_completions_and_setup_commands_parse() {
        let cli = Cli::try_parse_from(["smw-setup", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions { shell: Shell::Bash }));

        let cli = Cli::try_parse_from(["smw-setup", "-v", "finalize"]).unwrap();
        assert!(matches!(cli.command, Commands::Setup(SetupCommands::Finalize)));
        assert_eq!(cli.verbose, 1);

        let cli = Cli::try_parse_from(["smw-setup", "task", "add", "x", "a", "b"]).unwrap();
        assert!(matches!(cli.command, Commands::Setup(SetupCommands::Task(_))));
    }
}
