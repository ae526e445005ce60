//! User settings
//!
//! Review tolerance, lock timeout, logging and the under-funding policy.
//! Every field has a serde default so older config files keep loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::TillPaths;
use crate::error::TillError;
use crate::models::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// |variance| above this flags a closed shift for review
    #[serde(default = "default_variance_tolerance")]
    pub variance_tolerance: Money,

    /// How long a caller waits on a busy location before failing
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// tracing filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Record a justified opening gap as debt instead of waiving it
    #[serde(default)]
    pub track_justified_underfunding: bool,

    /// strftime format for dates in terminal output
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_variance_tolerance() -> Money {
    Money::from_units(5)
}

fn default_lock_timeout_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_symbol: default_currency(),
            variance_tolerance: default_variance_tolerance(),
            lock_timeout_ms: default_lock_timeout_ms(),
            log_level: default_log_level(),
            log_json: false,
            track_justified_underfunding: false,
            date_format: default_date_format(),
        }
    }
}

impl Settings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &TillPaths) -> Result<Self, TillError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| TillError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| TillError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), TillError> {
        if self.variance_tolerance.is_negative() {
            return Err(TillError::Config(
                "variance_tolerance cannot be negative".into(),
            ));
        }
        if self.lock_timeout_ms == 0 {
            return Err(TillError::Config(
                "lock_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, paths: &TillPaths) -> Result<(), TillError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TillError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| TillError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.variance_tolerance, Money::from_units(5));
        assert_eq!(settings.lock_timeout(), Duration::from_secs(2));
        assert!(!settings.track_justified_underfunding);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings {
            variance_tolerance: Money::from_cents(250),
            track_justified_underfunding: true,
            ..Settings::default()
        };
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.variance_tolerance.cents(), 250);
        assert!(loaded.track_justified_underfunding);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"log_level": "debug"}"#).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.lock_timeout_ms, 2000);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"lock_timeout_ms": 0}"#).unwrap();

        assert!(matches!(
            Settings::load_or_create(&paths),
            Err(TillError::Config(_))
        ));
    }
}
