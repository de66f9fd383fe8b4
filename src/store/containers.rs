use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TendError};
use crate::model::{ProjectContainer, hash_project_name};
use crate::store::codec;
use crate::store::lock::{FileLock, LOCK_TIMEOUT};

/// Per-project container files under `project_tasks/`, named by the content
/// hash of the project name. Lookup re-hashes the name on every access; the
/// hash persisted inside the record is only the container's own identity, so
/// renaming a project's display name never requires moving the file.
#[derive(Debug)]
pub struct ContainerStore {
    root: PathBuf,
}

impl ContainerStore {
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn containers_dir(&self) -> PathBuf {
        self.root.join("project_tasks")
    }

    pub fn container_path(&self, project: &str) -> PathBuf {
        self.containers_dir()
            .join(format!("{}.json", hash_project_name(project)))
    }

    fn lock_path(&self, project: &str) -> PathBuf {
        self.containers_dir()
            .join(format!("{}.lock", hash_project_name(project)))
    }

    pub fn lock(&self, project: &str) -> Result<FileLock> {
        FileLock::acquire(&self.lock_path(project), LOCK_TIMEOUT)
    }

    /// Load a project's container; a missing file yields a fresh empty
    /// container (load-or-create). A malformed file surfaces `Corrupt`.
    pub fn load(&self, project: &str) -> Result<ProjectContainer> {
        Ok(codec::read_record(&self.container_path(project))?
            .unwrap_or_else(|| ProjectContainer::new(project)))
    }

    /// Persist a container as a single-file rewrite, bumping its revision.
    /// Fails with `Conflict` when the on-disk revision no longer matches the
    /// loaded one.
    pub fn save(&self, container: &mut ProjectContainer) -> Result<()> {
        let path = self.containers_dir().join(format!(
            "{}.json",
            container.project_hash
        ));
        if let Some(on_disk) = codec::read_revision(&path)?
            && on_disk != container.revision
        {
            return Err(TendError::Conflict(path.display().to_string()));
        }
        container.revision += 1;
        codec::write_record(&path, container)
    }

    /// Remove a project's container file, if present.
    pub fn delete(&self, project: &str) -> Result<()> {
        let path = self.container_path(project);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Every container on disk, sorted by project name for deterministic
    /// iteration. Corrupt containers are skipped; listing is best-effort.
    pub fn list(&self) -> Result<Vec<ProjectContainer>> {
        let dir = self.containers_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut containers = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match codec::read_record::<ProjectContainer>(&path) {
                Ok(Some(container)) => containers.push(container),
                Ok(None) => {}
                Err(TendError::Corrupt { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        containers.sort_by(|a, b| a.project_name.cmp(&b.project_name));
        Ok(containers)
    }

    /// Project names with a container on disk, in the same order as `list`.
    pub fn project_names(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|c| c.project_name).collect())
    }

    /// Run a read-modify-write sequence under the container's file lock and
    /// persist the result.
    pub fn with_lock<R>(
        &self,
        project: &str,
        f: impl FnOnce(&mut ProjectContainer) -> Result<R>,
    ) -> Result<R> {
        let _lock = self.lock(project)?;
        let mut container = self.load(project)?;
        let out = f(&mut container)?;
        self.save(&mut container)?;
        Ok(out)
    }

    /// Like `with_lock`, but only persists when the closure returns `Some`.
    /// Used by operations that probe a container and may leave it untouched.
    pub fn try_with_lock<R>(
        &self,
        project: &str,
        f: impl FnOnce(&mut ProjectContainer) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        let _lock = self.lock(project)?;
        let mut container = self.load(project)?;
        match f(&mut container)? {
            Some(out) => {
                self.save(&mut container)?;
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    /// Fingerprint of the container directory from file metadata (name, size,
    /// nanosecond mtime). Cheap stat calls, detects additions, deletions and
    /// in-place edits; drives location-index staleness.
    pub fn fingerprint(&self) -> Result<String> {
        let dir = self.containers_dir();
        if !dir.exists() {
            return Ok(String::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            let meta = entry.metadata()?;
            let mtime = meta
                .modified()?
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            entries.push((stem.to_string(), meta.len(), mtime));
        }
        entries.sort();
        let fp = entries
            .iter()
            .map(|(stem, size, mtime)| format!("{stem}:{size}:{mtime}"))
            .collect::<Vec<_>>()
            .join(",");
        Ok(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bucket, Priority, Status, Task};
    use tempfile::tempdir;

    fn task(action: &str, project: &str, status: Status) -> Task {
        Task::new(
            action.into(),
            String::new(),
            Priority::Medium,
            project.into(),
            status,
        )
    }

    #[test]
    fn load_missing_is_empty_container() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        let container = store.load("general").unwrap();
        assert!(container.is_empty());
        assert_eq!(container.project_name, "general");
        assert_eq!(container.project_hash, hash_project_name("general"));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        let mut container = store.load("general").unwrap();
        let t = task("A", "general", Status::Todo);
        let id = t.id.clone();
        container.insert(t);
        store.save(&mut container).unwrap();

        let reloaded = store.load("general").unwrap();
        assert_eq!(reloaded.bucket_of(&id), Some(Bucket::Active));
        assert_eq!(reloaded.revision, 1);
    }

    #[test]
    fn lookup_hashes_name_on_access() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        store
            .with_lock("general", |c| {
                c.insert(task("A", "general", Status::Todo));
                Ok(())
            })
            .unwrap();
        let expected = dir
            .path()
            .join("project_tasks")
            .join(format!("{}.json", hash_project_name("general")));
        assert!(expected.exists());
    }

    #[test]
    fn list_skips_corrupt_containers() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        store
            .with_lock("general", |c| {
                c.insert(task("A", "general", Status::Todo));
                Ok(())
            })
            .unwrap();
        std::fs::write(dir.path().join("project_tasks/garbage.json"), "{oops").unwrap();

        let containers = store.list().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].project_name, "general");
    }

    #[test]
    fn save_detects_outside_writes() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        store.with_lock("general", |_| Ok(())).unwrap();

        let mut stale = store.load("general").unwrap();
        store.with_lock("general", |_| Ok(())).unwrap();

        let err = store.save(&mut stale).unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn try_with_lock_skips_save_on_none() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        store.with_lock("general", |_| Ok(())).unwrap();
        let before = store.load("general").unwrap().revision;

        let out: Option<()> = store.try_with_lock("general", |_| Ok(None)).unwrap();
        assert!(out.is_none());
        assert_eq!(store.load("general").unwrap().revision, before);
    }

    #[test]
    fn fingerprint_changes_on_write() {
        let dir = tempdir().unwrap();
        let store = ContainerStore::open(dir.path());
        let before = store.fingerprint().unwrap();
        store
            .with_lock("general", |c| {
                c.insert(task("A", "general", Status::Todo));
                Ok(())
            })
            .unwrap();
        let after = store.fingerprint().unwrap();
        assert_ne!(before, after);
    }
}
