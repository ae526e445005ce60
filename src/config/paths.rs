//! Path management
//!
//! ## Path Resolution Order
//!
//! 1. `TILL_DATA_DIR` environment variable (if set)
//! 2. The platform config directory for `till` as reported by `directories`
//!    (`~/.config/till` on Linux, `~/Library/Application Support/till` on
//!    macOS, `%APPDATA%\till\config` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::TillError;

/// Manages all paths used by the till engine
#[derive(Debug, Clone)]
pub struct TillPaths {
    base_dir: PathBuf,
}

impl TillPaths {
    /// Resolve the base directory from the environment or platform defaults
    pub fn new() -> Result<Self, TillError> {
        let base_dir = match std::env::var("TILL_DATA_DIR") {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create TillPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Where archived shift history is written
    pub fn archive_dir(&self) -> PathBuf {
        self.base_dir.join("archive")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Location configuration (fixed floats)
    pub fn locations_file(&self) -> PathBuf {
        self.data_dir().join("locations.json")
    }

    /// Shifts, expenses and recovery records, committed as one image
    pub fn ledger_file(&self) -> PathBuf {
        self.data_dir().join("ledger.json")
    }

    /// Advisory lock files, one per location
    pub fn lock_dir(&self) -> PathBuf {
        self.data_dir().join("locks")
    }

    /// Advisory lock serializing ledger commits across processes
    pub fn commit_lock_file(&self) -> PathBuf {
        self.data_dir().join("ledger.lock")
    }

    /// Ensure base, data, lock, archive and log directories exist
    pub fn ensure_directories(&self) -> Result<(), TillError> {
        for dir in [
            self.base_dir.clone(),
            self.data_dir(),
            self.lock_dir(),
            self.archive_dir(),
            self.log_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                TillError::Io(format!("Failed to create directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, TillError> {
    ProjectDirs::from("", "", "till")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| TillError::Config("Could not determine a home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(
            paths.ledger_file(),
            temp_dir.path().join("data").join("ledger.json")
        );
        assert_eq!(paths.archive_dir(), temp_dir.path().join("archive"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.data_dir().exists());
        assert!(paths.lock_dir().exists());
        assert!(paths.archive_dir().exists());
        assert!(paths.log_dir().exists());
        assert!(!paths.is_initialized());
    }
}
