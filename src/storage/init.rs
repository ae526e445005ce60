//! Storage initialization
//!
//! Handles first-run setup: directory tree, default settings, and empty
//! location and ledger files.

use crate::config::paths::TillPaths;
use crate::config::settings::Settings;
use crate::error::TillError;

use super::file_io::write_json_atomic;
use super::ledger::LedgerImage;

/// Initialize storage for a fresh installation
///
/// Existing files are left untouched, so running it twice is harmless.
pub fn initialize_storage(paths: &TillPaths) -> Result<(), TillError> {
    paths.ensure_directories()?;

    if !paths.settings_file().exists() {
        Settings::default().save(paths)?;
    }

    if !paths.locations_file().exists() {
        write_json_atomic(
            paths.locations_file(),
            &serde_json::json!({ "locations": [] }),
        )?;
    }

    if !paths.ledger_file().exists() {
        write_json_atomic(paths.ledger_file(), &LedgerImage::default())?;
    }

    Ok(())
}

/// Check if storage needs initialization
pub fn needs_initialization(paths: &TillPaths) -> bool {
    !paths.settings_file().exists() || !paths.ledger_file().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert!(needs_initialization(&paths));
        initialize_storage(&paths).unwrap();

        assert!(!needs_initialization(&paths));
        assert!(paths.locations_file().exists());
        assert!(paths.archive_dir().exists());
    }

    #[test]
    fn test_initialize_twice_keeps_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());
        initialize_storage(&paths).unwrap();

        let settings = Settings {
            lock_timeout_ms: 9000,
            ..Settings::default()
        };
        settings.save(&paths).unwrap();

        initialize_storage(&paths).unwrap();
        let reloaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(reloaded.lock_timeout_ms, 9000);
    }
}
