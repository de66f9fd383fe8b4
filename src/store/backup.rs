use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, TendError};

const RESTORE_PREFIX: &str = ".restore.";

/// Whole-tree snapshots under `backups/`, one timestamp-named directory per
/// snapshot. Restore swaps the snapshot in through a staging directory so an
/// interrupted restore never leaves the storage root empty.
#[derive(Debug)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Snapshot the storage root, excluding `backups/` itself (no nesting)
    /// and any in-flight restore staging.
    pub fn create(&self) -> Result<String> {
        let dir = self.backups_dir();
        fs::create_dir_all(&dir)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let mut name = format!("backup_{stamp}");
        let mut n = 1;
        while dir.join(&name).exists() {
            n += 1;
            name = format!("backup_{stamp}-{n}");
        }

        let dest = dir.join(&name);
        fs::create_dir_all(&dest)?;
        for path in self.swappable_entries()? {
            let entry_name = path.file_name().ok_or_else(|| {
                std::io::Error::other(format!("unnamed entry {}", path.display()))
            })?;
            copy_entry(&path, &dest.join(entry_name))?;
        }
        Ok(name)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.backups_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Restore a named snapshot. Takes a fresh safety backup of the current
    /// state first, then builds the restored tree in a staging directory and
    /// swaps it in, rolling the previous entries back if the swap fails.
    pub fn restore(&self, name: &str) -> Result<()> {
        let snapshot = self.backups_dir().join(name);
        if !snapshot.is_dir() {
            return Err(TendError::BackupNotFound(name.to_string()));
        }

        self.remove_stale_staging();
        self.create()?;

        let nonce = Uuid::new_v4().simple().to_string();
        let staging = self.root.join(format!("{RESTORE_PREFIX}{nonce}.staging"));
        let old = self.root.join(format!("{RESTORE_PREFIX}{nonce}.old"));

        if let Err(err) = copy_entry(&snapshot, &staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }
        fs::create_dir_all(&old)?;

        if let Err(err) = self.swap(&staging, &old) {
            let _ = fs::remove_dir_all(&staging);
            let _ = fs::remove_dir_all(&old);
            return Err(err);
        }

        let _ = fs::remove_dir_all(&staging);
        let _ = fs::remove_dir_all(&old);
        Ok(())
    }

    /// Move the current entries aside, then the staged entries into place.
    /// Each phase undoes its own partial work on failure, so the root ends
    /// up either fully restored or exactly as it was.
    fn swap(&self, staging: &Path, old: &Path) -> Result<()> {
        let current = self.swappable_entries()?;
        for (moved, path) in current.iter().enumerate() {
            let entry_name = path.file_name().ok_or_else(|| {
                std::io::Error::other(format!("unnamed entry {}", path.display()))
            })?;
            if let Err(err) = fs::rename(path, old.join(entry_name)) {
                for path in &current[..moved] {
                    if let Some(name) = path.file_name() {
                        let _ = fs::rename(old.join(name), path);
                    }
                }
                return Err(err.into());
            }
        }

        let mut staged = Vec::new();
        for entry in fs::read_dir(staging)? {
            staged.push(entry?.file_name());
        }
        for (landed, name) in staged.iter().enumerate() {
            if let Err(err) = fs::rename(staging.join(name), self.root.join(name)) {
                if let Err(rollback_err) = self.rollback(&staged[..landed], old) {
                    return Err(std::io::Error::other(format!(
                        "restore swap failed and rollback failed; previous state left at {}: \
                         swap error: {err}; rollback error: {rollback_err}",
                        old.display()
                    ))
                    .into());
                }
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Undo a half-finished second phase: clear the staged entries that
    /// landed in the root, then move the previous entries back.
    fn rollback(&self, landed: &[std::ffi::OsString], old: &Path) -> std::io::Result<()> {
        for name in landed {
            remove_entry(&self.root.join(name))?;
        }
        for entry in fs::read_dir(old)? {
            let entry = entry?;
            fs::rename(entry.path(), self.root.join(entry.file_name()))?;
        }
        Ok(())
    }

    /// Top-level entries that participate in snapshots and swaps: everything
    /// except `backups/` and restore staging directories.
    fn swappable_entries(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == "backups" || name.starts_with(RESTORE_PREFIX) {
                continue;
            }
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    /// Staging left behind by a killed restore is garbage; clear it before
    /// starting a new one.
    fn remove_stale_staging(&self) {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(RESTORE_PREFIX) {
                let _ = fs::remove_dir_all(entry.path());
            }
        }
    }
}

fn copy_entry(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        copy_dir_recursive(src, dst)?;
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

fn remove_entry(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
