//! Per-location exclusive access
//!
//! Shift-mutating operations on one location run one at a time, across
//! threads and across `till` processes sharing a data directory. Threads of
//! one process queue on a condvar; processes contend on an advisory lock file
//! per location under `data/locks/`. A caller that cannot get the location
//! within the timeout gets `TillError::Busy` instead of waiting forever;
//! other locations are never blocked.

use std::collections::HashSet;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::TillError;
use crate::models::LocationId;

/// Pause between attempts on a lock file held by another process
const FILE_LOCK_RETRY: Duration = Duration::from_millis(5);

pub struct LocationLocks {
    held: Mutex<HashSet<LocationId>>,
    released: Condvar,
    lock_dir: PathBuf,
}

impl LocationLocks {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            lock_dir: lock_dir.into(),
        }
    }

    /// Take exclusive access to a location, waiting at most `timeout`
    pub fn acquire(
        &self,
        location_id: LocationId,
        timeout: Duration,
    ) -> Result<LocationGuard<'_>, TillError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let busy = || TillError::Busy {
            location: location_id.to_string(),
            waited_ms: started.elapsed().as_millis() as u64,
        };

        let mut held = self
            .held
            .lock()
            .map_err(|e| TillError::Storage(format!("Failed to acquire lock table: {}", e)))?;

        while held.contains(&location_id) {
            let now = Instant::now();
            if now >= deadline {
                return Err(busy());
            }

            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|e| TillError::Storage(format!("Failed to wait on lock table: {}", e)))?;
            held = guard;
        }

        held.insert(location_id);
        drop(held);

        let mut guard = LocationGuard {
            locks: self,
            location_id,
            file: None,
        };
        let path = self.lock_dir.join(format!("{}.lock", location_id.as_uuid()));
        match try_lock_until(&path, deadline)? {
            Some(file) => guard.file = Some(file),
            // Dropping the guard hands the in-process slot to the next waiter
            None => return Err(busy()),
        }
        Ok(guard)
    }

    pub fn is_held(&self, location_id: LocationId) -> bool {
        self.held
            .lock()
            .map(|held| held.contains(&location_id))
            .unwrap_or(false)
    }

    fn release(&self, location_id: LocationId) {
        // A poisoned table still has to drop the entry or the location stays stuck
        let mut held = match self.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&location_id);
        drop(held);
        self.released.notify_all();
    }
}

/// Releases the location when dropped
pub struct LocationGuard<'a> {
    locks: &'a LocationLocks,
    location_id: LocationId,
    file: Option<File>,
}

impl LocationGuard<'_> {
    pub fn location_id(&self) -> LocationId {
        self.location_id
    }
}

impl Drop for LocationGuard<'_> {
    fn drop(&mut self) {
        // Closing the file releases the cross-process lock first
        drop(self.file.take());
        self.locks.release(self.location_id);
    }
}

/// Held while the ledger image is re-read, rewritten and swapped in
pub struct CommitLock {
    _file: File,
}

impl CommitLock {
    /// Block until no other writer, in this or another process, holds `path`
    pub fn acquire(path: &Path) -> Result<Self, TillError> {
        let file = open_lock_file(path)?;
        file.lock()
            .map_err(|e| TillError::Storage(format!("Failed to lock {}: {}", path.display(), e)))?;
        Ok(Self { _file: file })
    }
}

fn open_lock_file(path: &Path) -> Result<File, TillError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            TillError::Io(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| TillError::Io(format!("Failed to open {}: {}", path.display(), e)))
}

/// Poll an advisory file lock until it is ours or `deadline` passes.
///
/// Each attempt opens a fresh handle, so two threads of one process contend
/// just like two processes do.
fn try_lock_until(path: &Path, deadline: Instant) -> Result<Option<File>, TillError> {
    let file = open_lock_file(path)?;
    loop {
        match file.try_lock() {
            Ok(()) => return Ok(Some(file)),
            Err(TryLockError::WouldBlock) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                thread::sleep(FILE_LOCK_RETRY.min(deadline - now));
            }
            Err(TryLockError::Error(e)) => {
                return Err(TillError::Storage(format!(
                    "Failed to lock {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
}
