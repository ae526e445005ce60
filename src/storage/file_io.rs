//! File I/O utilities with atomic writes

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::TillError;

fn storage_err(action: &str, path: &Path, e: impl std::fmt::Display) -> TillError {
    TillError::Storage(format!("Failed to {} {}: {}", action, path.display(), e))
}

/// Read JSON from a file, returning a default value if the file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, TillError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path).map_err(|e| storage_err("open", path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| storage_err("parse", path, e))
}

/// Write JSON atomically: temp file in the same directory, fsync, rename
///
/// The target is either the complete new image or the untouched old one.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), TillError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| storage_err("create directory", parent, e))?;
    }

    let temp_path = path.with_extension("json.tmp");

    let result = (|| {
        let file = File::create(&temp_path).map_err(|e| storage_err("create", &temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)
            .map_err(|e| storage_err("serialize", path, e))?;
        writer.flush().map_err(|e| storage_err("flush", &temp_path, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| storage_err("sync", &temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| storage_err("replace", path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct Drawer {
        name: String,
        float_cents: i64,
    }

    fn drawer() -> Drawer {
        Drawer {
            name: "front".to_string(),
            float_cents: 10000,
        }
    }

    #[test]
    fn test_read_nonexistent_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let data: Drawer = read_json(temp_dir.path().join("missing.json")).unwrap();
        assert_eq!(data, Drawer::default());
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("drawer.json");

        write_json_atomic(&path, &drawer()).unwrap();
        let loaded: Drawer = read_json(&path).unwrap();

        assert_eq!(loaded, drawer());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_failed_write_keeps_old_content_and_cleans_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("drawer.json");
        write_json_atomic(&path, &drawer()).unwrap();

        // A directory where the temp file should go makes the write fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();
        let updated = Drawer {
            name: "back".into(),
            float_cents: 1,
        };
        assert!(write_json_atomic(&path, &updated).is_err());

        let loaded: Drawer = read_json(&path).unwrap();
        assert_eq!(loaded, drawer());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("drawer.json");
        std::fs::write(&path, "not json").unwrap();

        let result: Result<Drawer, _> = read_json(&path);
        assert!(matches!(result, Err(TillError::Storage(_))));
    }
}
