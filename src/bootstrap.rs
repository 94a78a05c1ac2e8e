//! Request bootstrap
//!
//! Loads the setup file once per context and decides whether storage code
//! may run. Persistence failures end the process here, never inside the
//! store.

use crate::config::SetupConfig;
use crate::context::{Runtime, SetupContext};
use crate::state::{SchemaStatus, SetupError, SetupFile};
use colored::Colorize;

/// Build a context for `runtime` and load the setup file into it
pub fn bootstrap(config: SetupConfig, runtime: Runtime) -> (SetupFile, SetupContext) {
    let setup_file = SetupFile::new();
    let mut ctx = SetupContext::new(config, runtime);
    setup_file.load_schema(&mut ctx);
    (setup_file, ctx)
}

/// Operator-facing message for a schema that must not be used
///
/// Returns `None` for a good schema.
pub fn schema_notice(status: SchemaStatus) -> Option<String> {
    let notice = match status {
        SchemaStatus::Good => return None,
        SchemaStatus::Missing => {
            "No setup information was found for this installation. \
             Run `smw-setup finalize` after the database tables have been created."
        }
        SchemaStatus::KeyMismatch => {
            "The database schema does not match the current configuration. \
             Run the upgrade tooling, then `smw-setup finalize`."
        }
        SchemaStatus::Maintenance => {
            "The installation is in maintenance mode while an upgrade is running. \
             Storage operations are blocked until `smw-setup finalize` completes."
        }
    };

    Some(notice.to_string())
}

/// Diagnostic printed before aborting on an unwritable setup file
pub fn fatal_diagnostic(err: &SetupError) -> String {
    format!(
        "\n\nERROR: {}\n\
         \n       The \"config_dir\" setting should point to a\
         \n       directory that is persistent and writable!\n",
        err
    )
}

/// Terminate the process after a persistence failure
///
/// An unpersisted upgrade key or maintenance change would leave the
/// installation believing it is consistent, so there is no recovery.
pub fn abort_on_persistence_failure(err: &SetupError) -> ! {
    eprintln!("{}", fatal_diagnostic(err).red());
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_loads_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = SetupConfig {
            config_dir: temp_dir.path().to_path_buf(),
            ..SetupConfig::default()
        };

        {
            let (setup_file, mut ctx) = bootstrap(config.clone(), Runtime::Cli);
            assert!(!ctx.is_loaded());
            setup_file.finalize(&mut ctx).unwrap();
        }

        let (setup_file, ctx) = bootstrap(config, Runtime::Request);
        assert!(ctx.is_loaded());
        assert_eq!(setup_file.schema_status(&ctx), SchemaStatus::Good);
        assert!(schema_notice(setup_file.schema_status(&ctx)).is_none());
    }

    #[test]
    fn test_schema_notice() {
        for status in [
            SchemaStatus::Missing,
            SchemaStatus::KeyMismatch,
            SchemaStatus::Maintenance,
        ] {
            let notice = schema_notice(status).unwrap();
            assert!(notice.contains("smw-setup finalize"));
        }
    }

    #[test]
    fn test_fatal_diagnostic_names_setting() {
        let err = SetupError::NotWritable {
            path: "/readonly/.smw.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let diagnostic = fatal_diagnostic(&err);
        assert!(diagnostic.contains("ERROR: Unable to write the setup file /readonly/.smw.json"));
        assert!(diagnostic.contains("\"config_dir\""));
    }
}
