use super::error::{Result, SetupError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Durable write of the serialized setup document
pub trait StateFileWriter {
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
}

/// Writes to a temporary file in the target directory, then renames it over
/// the setup file. The directory is never created: a missing directory is a
/// misconfiguration and reported as `SetupError::NotWritable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicFileWriter;

impl StateFileWriter for AtomicFileWriter {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let not_writable = |source: std::io::Error| SetupError::NotWritable {
            path: path.to_path_buf(),
            source,
        };

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp_file = NamedTempFile::new_in(parent).map_err(not_writable)?;
        temp_file
            .write_all(contents.as_bytes())
            .map_err(not_writable)?;
        temp_file.flush().map_err(not_writable)?;
        temp_file.as_file().sync_all().map_err(not_writable)?;

        // persist() replaces the target atomically, on Windows too
        temp_file.persist(path).map_err(|e| not_writable(e.error))?;

        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".smw.json");

        AtomicFileWriter.write(&path, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        AtomicFileWriter.write(&path, "{\n  \"a\": 1\n}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}");

        // No temp files left behind
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_missing_directory_is_not_writable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join(".smw.json");

        let err = AtomicFileWriter.write(&path, "{}").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains(".smw.json"));
        assert!(!path.exists());
    }
}
