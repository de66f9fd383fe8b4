use std::path::{Path, PathBuf};

use crate::error::{Result, TendError};
use crate::model::{Task, TaskCollection, TaskFilters};
use crate::store::codec;
use crate::store::lock::{FileLock, LOCK_TIMEOUT};

/// The three named collections of the original flat storage scheme. There is
/// no `deleted` collection; the legacy lifecycle is a strict subset of the
/// container scheme's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LegacyCollection {
    Active,
    Completed,
    Archived,
}

impl LegacyCollection {
    pub const ALL: [Self; 3] = [Self::Active, Self::Completed, Self::Archived];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for LegacyCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legacy flat store: three versioned collection files under `tasks/`.
#[derive(Debug)]
pub struct LegacyStore {
    root: PathBuf,
}

impl LegacyStore {
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    pub fn collection_file(&self, collection: LegacyCollection) -> PathBuf {
        self.tasks_dir().join(format!("{}.json", collection.as_str()))
    }

    fn lock_path(&self, collection: LegacyCollection) -> PathBuf {
        self.tasks_dir().join(format!("{}.lock", collection.as_str()))
    }

    pub fn lock(&self, collection: LegacyCollection) -> Result<FileLock> {
        FileLock::acquire(&self.lock_path(collection), LOCK_TIMEOUT)
    }

    /// Load a collection; a missing file is an empty collection.
    pub fn load(&self, collection: LegacyCollection) -> Result<TaskCollection> {
        Ok(codec::read_record(&self.collection_file(collection))?.unwrap_or_default())
    }

    /// Save a collection, bumping its revision. Fails with `Conflict` when
    /// the on-disk revision no longer matches the loaded one.
    pub fn save(
        &self,
        collection: LegacyCollection,
        record: &mut TaskCollection,
    ) -> Result<()> {
        let path = self.collection_file(collection);
        if let Some(on_disk) = codec::read_revision(&path)?
            && on_disk != record.revision
        {
            return Err(TendError::Conflict(path.display().to_string()));
        }
        record.revision += 1;
        codec::write_record(&path, record)
    }

    /// Seed the three collection files if absent (used by init).
    pub fn ensure_files(&self) -> Result<()> {
        for collection in LegacyCollection::ALL {
            let path = self.collection_file(collection);
            if !path.exists() {
                codec::write_record(&path, &TaskCollection::new())?;
            }
        }
        Ok(())
    }

    /// Insert a new task into the `active` collection.
    pub fn add(&self, task: Task) -> Result<()> {
        let _lock = self.lock(LegacyCollection::Active)?;
        let mut record = self.load(LegacyCollection::Active)?;
        record.add_task(task);
        self.save(LegacyCollection::Active, &mut record)
    }

    /// Search active, then completed, then archived.
    pub fn get(&self, id: &str) -> Result<Task> {
        for collection in LegacyCollection::ALL {
            if let Some(task) = self.load(collection)?.get_task(id) {
                return Ok(task.clone());
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Locate the collection currently holding the task.
    pub fn owner_of(&self, id: &str) -> Result<Option<LegacyCollection>> {
        for collection in LegacyCollection::ALL {
            if self.load(collection)?.get_task(id).is_some() {
                return Ok(Some(collection));
            }
        }
        Ok(None)
    }

    /// Apply a mutator to the task in whichever collection holds it and
    /// rewrite that collection. Locks are taken one collection at a time.
    pub fn update(&self, id: &str, updates: crate::model::TaskUpdate) -> Result<Task> {
        for collection in LegacyCollection::ALL {
            let _lock = self.lock(collection)?;
            let mut record = self.load(collection)?;
            if let Some(task) = record.get_task_mut(id) {
                task.apply(updates.clone())?;
                let updated = task.clone();
                self.save(collection, &mut record)?;
                return Ok(updated);
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Remove the task from whichever collection holds it.
    pub fn delete(&self, id: &str) -> Result<()> {
        for collection in LegacyCollection::ALL {
            let _lock = self.lock(collection)?;
            let mut record = self.load(collection)?;
            if record.remove_task(id).is_some() {
                self.save(collection, &mut record)?;
                return Ok(());
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Relocate a task between two named collections. Fails with
    /// `TaskNotFound` when it is absent in `from`. Both locks are taken in
    /// canonical collection order so concurrent movers cannot deadlock.
    pub fn move_task(
        &self,
        id: &str,
        from: LegacyCollection,
        to: LegacyCollection,
    ) -> Result<()> {
        if from == to {
            let _lock = self.lock(from)?;
            let record = self.load(from)?;
            if record.get_task(id).is_none() {
                return Err(TendError::TaskNotFound(id.to_string()));
            }
            return Ok(());
        }

        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let _first_lock = self.lock(first)?;
        let _second_lock = self.lock(second)?;

        let mut from_record = self.load(from)?;
        let task = from_record
            .remove_task(id)
            .ok_or_else(|| TendError::TaskNotFound(id.to_string()))?;
        self.save(from, &mut from_record)?;

        let mut to_record = self.load(to)?;
        to_record.add_task(task);
        self.save(to, &mut to_record)
    }

    /// Move the task into `completed` and map its status to done with full
    /// progress.
    pub fn complete(&self, id: &str) -> Result<Task> {
        let owner = self
            .owner_of(id)?
            .ok_or_else(|| TendError::TaskNotFound(id.to_string()))?;

        if owner == LegacyCollection::Completed {
            let _lock = self.lock(owner)?;
            let mut record = self.load(owner)?;
            let task = record
                .get_task_mut(id)
                .ok_or_else(|| TendError::TaskNotFound(id.to_string()))?;
            task.complete();
            let completed = task.clone();
            self.save(owner, &mut record)?;
            return Ok(completed);
        }

        let (first, second) = if owner < LegacyCollection::Completed {
            (owner, LegacyCollection::Completed)
        } else {
            (LegacyCollection::Completed, owner)
        };
        let _first_lock = self.lock(first)?;
        let _second_lock = self.lock(second)?;

        let mut from_record = self.load(owner)?;
        let mut task = from_record
            .remove_task(id)
            .ok_or_else(|| TendError::TaskNotFound(id.to_string()))?;
        task.complete();
        let completed = task.clone();
        self.save(owner, &mut from_record)?;

        let mut to_record = self.load(LegacyCollection::Completed)?;
        to_record.add_task(task);
        self.save(LegacyCollection::Completed, &mut to_record)?;
        Ok(completed)
    }

    /// Union of all three collections in collection order. Corrupt
    /// collections are skipped; listing is best-effort.
    pub fn list(&self, filters: &TaskFilters) -> Result<Vec<Task>> {
        let mut all = Vec::new();
        for collection in LegacyCollection::ALL {
            match self.load(collection) {
                Ok(record) => {
                    all.extend(record.filtered(filters).into_iter().cloned());
                }
                Err(TendError::Corrupt { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(all)
    }

    /// Total task count across the three collections, counting unreadable
    /// collections as empty.
    pub fn total_tasks(&self) -> usize {
        LegacyCollection::ALL
            .iter()
            .map(|&c| self.load(c).map(|r| r.tasks.len()).unwrap_or(0))
            .sum()
    }
}
