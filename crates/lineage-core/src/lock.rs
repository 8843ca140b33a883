//! Advisory file lock serializing `lin` processes that share one store.
//!
//! SQLite's `BEGIN IMMEDIATE` already orders writers inside one database;
//! the lock file additionally keeps a multi-step command (e.g. reset then
//! reorganize) from interleaving with another process's writes.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ErrorCode;

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock on {} not acquired after {waited:?}", path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("lock file error: {0}")]
    Io(#[from] io::Error),
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io(_) => ErrorCode::InternalUnexpected,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Lock file guarding the store at `store_path`.
pub fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    store_path.with_file_name(name)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Shared,
    Exclusive,
}

/// RAII guard; the lock is released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
    mode: Mode,
}

impl StoreLock {
    /// Shared lock for read-only commands.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] if a writer holds the lock past `timeout`.
    pub fn acquire_shared(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, timeout, Mode::Shared)
    }

    /// Exclusive lock for mutating commands.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] if any other holder keeps the lock past
    /// `timeout`.
    pub fn acquire_exclusive(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, timeout, Mode::Exclusive)
    }

    fn acquire(path: &Path, timeout: Duration, mode: Mode) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let start = Instant::now();
        loop {
            // Fully qualified: std's `File` has inherent lock methods with
            // different error types on newer toolchains.
            let acquired = match mode {
                Mode::Shared => FileExt::try_lock_shared(&file).is_ok(),
                Mode::Exclusive => FileExt::try_lock_exclusive(&file).is_ok(),
            };
            if acquired {
                tracing::trace!(path = %path.display(), ?mode, "store lock acquired");
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    mode,
                });
            }
            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited: start.elapsed(),
                });
            }
            thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_exclusive(&self) -> bool {
        self.mode == Mode::Exclusive
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
