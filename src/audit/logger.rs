//! Append-only JSONL audit log
//!
//! Each entry is written as a single JSON line and flushed immediately.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{TillError, TillResult};
use crate::external::AuditSink;

use super::entry::AuditEntry;

/// File-backed audit sink
pub struct AuditLogger {
    log_path: PathBuf,
    /// Serialises appends so concurrent locations never interleave lines
    write_lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append one entry and flush
    pub fn log(&self, entry: &AuditEntry) -> TillResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| TillError::Json(format!("Failed to serialize audit entry: {}", e)))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| TillError::Storage(format!("Audit log lock poisoned: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| TillError::Io(format!("Failed to open audit log: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| TillError::Io(format!("Failed to write audit entry: {}", e)))?;

        file.flush()
            .map_err(|e| TillError::Io(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Read all entries, oldest first
    pub fn read_all(&self) -> TillResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| TillError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                TillError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                TillError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Read the most recent N entries
    pub fn read_recent(&self, count: usize) -> TillResult<Vec<AuditEntry>> {
        let all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries[start..].to_vec())
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

impl AuditSink for AuditLogger {
    fn append(&self, entry: &AuditEntry) -> TillResult<()> {
        self.log(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{Action, EntityType};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp_dir.path().join("audit.log"));
        (logger, temp_dir)
    }

    fn entry(id: usize) -> AuditEntry {
        AuditEntry::new("op-1", Action::OpenShift, EntityType::Shift, format!("sft-{}", id))
            .after(&json!({"opening_amount": 10000}))
    }

    #[test]
    fn test_log_and_read() {
        let (logger, _temp) = create_test_logger();
        logger.log(&entry(1)).unwrap();

        let entries = logger.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, Action::OpenShift);
        assert_eq!(entries[0].actor, "op-1");
    }

    #[test]
    fn test_read_recent() {
        let (logger, _temp) = create_test_logger();
        for i in 0..10 {
            logger.append(&entry(i)).unwrap();
        }

        let recent = logger.read_recent(3).unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["sft-7", "sft-8", "sft-9"]);
    }

    #[test]
    fn test_empty_log() {
        let (logger, _temp) = create_test_logger();
        assert!(logger.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_appends_stay_line_delimited() {
        let (logger, _temp) = create_test_logger();
        std::thread::scope(|s| {
            for t in 0..4 {
                let logger = &logger;
                s.spawn(move || {
                    for i in 0..25 {
                        logger.log(&entry(t * 100 + i)).unwrap();
                    }
                });
            }
        });

        assert_eq!(logger.read_all().unwrap().len(), 100);
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let logger = AuditLogger::new(temp_dir.path().to_path_buf());
        assert!(logger.log(&entry(1)).is_err());
    }
}
