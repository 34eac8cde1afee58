//! Exclusive advisory lock around roster writes.
//!
//! The roster core does no locking of its own. The bot and the CLI take this
//! lock before an upsert so two processes never interleave an
//! open-mutate-persist cycle on the same file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::warn;

use crate::error::{Error, Result};

/// Lock guard; the lock is released on drop.
///
/// The lock file stays on disk so every process locks the same inode.
#[derive(Debug)]
pub struct RosterLock {
    lock_file: Option<File>,
}

impl RosterLock {
    /// Lock file path used for a roster: `<roster>.lock`.
    pub fn lock_path(roster: &Path) -> PathBuf {
        let mut name = roster
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        roster.with_file_name(name)
    }

    /// Try to take the lock without waiting.
    pub fn acquire(roster: &Path) -> Result<Self> {
        let path = Self::lock_path(roster);
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                warn!(lock = %path.display(), "Roster is being written by another process");
                Err(Error::RosterLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
        }
    }
}

impl Drop for RosterLock {
    fn drop(&mut self) {
        self.release();
    }
}
