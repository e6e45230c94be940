// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-process run lock.
//!
//! Two imports writing the same history tables could both see a key as
//! missing and append it twice, so only one import may run per data
//! directory. The lock is an OS advisory lock on a file in that directory.
//! The kernel drops it when the holder exits, so a crashed run never leaves
//! the directory locked. The file itself stays behind and only records the
//! pid of the last holder.

use crate::error::AppError;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILENAME: &str = ".import.lock";

/// Exclusive lock held for the duration of an import.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    /// Closing the file releases the lock
    _file: File,
}

impl RunLock {
    /// Take the lock in `dir`, failing if another run holds it.
    pub fn acquire(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = dir.as_ref().join(LOCK_FILENAME);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(AppError::Storage(format!(
                    "Another import is already running (lock file {})",
                    path.display()
                )));
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        tracing::debug!(path = %path.display(), "Run lock acquired");
        Ok(Self { path, _file: file })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "Run lock released");
    }
}
