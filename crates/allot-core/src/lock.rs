//! Cross-process advisory lock for filesystem-backed experiments.
//!
//! The facade serializes callers within one process; this lock is the
//! external serialization for deployments where several processes mutate
//! the same experiment directory.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// Advisory lock errors.
#[derive(Debug)]
pub enum LockError {
    Timeout { path: PathBuf, waited: Duration },
    IoError(io::Error),
}

impl From<io::Error> for LockError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::StorageFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { path, waited } => {
                write!(
                    f,
                    "{}: lock timed out after {:?} at {}",
                    self.code().code(),
                    waited,
                    path.display()
                )
            }
            Self::IoError(err) => write!(f, "{}: {}", self.code().code(), err),
        }
    }
}

impl std::error::Error for LockError {}

/// RAII guard for the per-experiment exclusive lock.
#[derive(Debug)]
pub struct ExperimentLock {
    file: File,
    path: PathBuf,
}

impl ExperimentLock {
    /// Acquire an exclusive advisory lock on the lock path, polling until
    /// `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "lock path has no parent")
        })?;
        fs::create_dir_all(parent)?;

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited: start.elapsed(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Explicitly release the lock. Release also happens automatically on drop.
    pub fn release(self) {
        let _ = self.file.unlock();
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExperimentLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::{ExperimentLock, LockError};
    use crate::error::ErrorCode;
    use std::{path::PathBuf, time::Duration};

    fn lock_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push("allot_lock_tests");
        path.push(name);
        path
    }

    #[test]
    fn lock_allows_acquire_and_release() -> Result<(), LockError> {
        let path = lock_path("basic.lock");
        let lock = ExperimentLock::acquire(&path, Duration::from_millis(50))?;
        assert_eq!(lock.path(), path.as_path());
        lock.release();
        Ok(())
    }

    #[test]
    fn lock_times_out_when_held() {
        let path = lock_path("timeout.lock");
        let _guard = ExperimentLock::acquire(&path, Duration::from_millis(50)).expect("first");
        let err = ExperimentLock::acquire(&path, Duration::from_millis(20)).expect_err("second");

        assert!(matches!(err, LockError::Timeout { path: p, .. } if p == path));
    }

    #[test]
    fn lock_error_maps_to_machine_code() {
        let timeout = LockError::Timeout {
            path: lock_path("code.lock"),
            waited: Duration::from_millis(10),
        };
        assert_eq!(timeout.code(), ErrorCode::LockContention);
        assert!(timeout.hint().is_some());
    }

    #[test]
    fn release_allows_follow_up_lock() -> Result<(), LockError> {
        let path = lock_path("release-followup.lock");
        {
            let _first = ExperimentLock::acquire(&path, Duration::from_millis(50))?;
        }

        let _second = ExperimentLock::acquire(&path, Duration::from_millis(50))?;
        Ok(())
    }
}
