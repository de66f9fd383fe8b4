use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Result, TendError};

/// How long a read-modify-write sequence may wait for a file before the
/// operation fails with `Contention`.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock on a file. Released on drop, so every exit path
/// (including error paths) unlocks.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, retrying until `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(TendError::Contention(path.display().to_string()));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_and_drop_releases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.lock");

        let lock = FileLock::acquire(&path, Duration::from_millis(50)).unwrap();
        assert_eq!(lock.path(), path);
        drop(lock);

        // Reacquirable after release.
        let _again = FileLock::acquire(&path, Duration::from_millis(50)).unwrap();
    }

    #[test]
    fn contention_surfaces_after_timeout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("held.lock");

        let _held = FileLock::acquire(&path, Duration::from_millis(50)).unwrap();
        let err = FileLock::acquire(&path, Duration::from_millis(60)).unwrap_err();
        assert_eq!(err.code(), "contention");
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep/nested/file.lock");
        let _lock = FileLock::acquire(&path, Duration::from_millis(50)).unwrap();
        assert!(path.exists());
    }
}
