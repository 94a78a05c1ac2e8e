//! Incomplete task CLI commands

use crate::cli::status::print_tasks;
use crate::state::SetupFile;
use crate::{Result, SetupContext};
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Register an incomplete task
    Add {
        /// Task key (usually a message key)
        key: String,

        /// Task arguments
        args: Vec<String>,
    },

    /// Mark a task as completed
    Remove {
        /// Task key
        key: String,
    },

    /// List incomplete tasks, including unfinished backend jobs
    List {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
}

pub fn run(setup_file: &SetupFile, ctx: &mut SetupContext, cmd: TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::Add { key, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            setup_file.add_incomplete_task_with_args(ctx, &key, &args)?;
            println!("{}", format!("Added task '{}'", key).green());
        }

        TaskCommands::Remove { key } => {
            setup_file.remove_incomplete_task(ctx, &key)?;
            println!("{}", format!("Removed task '{}'", key).green());
        }

        TaskCommands::List { json } => {
            let tasks = setup_file.find_incomplete_tasks(ctx);

            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("{}", "No incomplete tasks".green());
            } else {
                println!("{}", "Incomplete tasks:".yellow());
                print_tasks(&tasks);
            }
        }
    }

    Ok(())
}
