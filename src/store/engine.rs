use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Result, TendError};
use crate::model::{
    Config, Project, ProjectStats, Status, Task, TaskFilters, TaskUpdate,
};
use crate::store::backup::BackupStore;
use crate::store::config;
use crate::store::consistency;
use crate::store::containers::ContainerStore;
use crate::store::index::LocationIndex;
use crate::store::legacy::LegacyStore;
use crate::store::migration::{self, MigrationOptions};

/// External embedding provider. The engine only consumes the vector; how it
/// is produced (model, service, dimensionality) is someone else's concern.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Storage façade over the legacy flat store and the project container
/// store. The storage root is explicit; nothing here reaches for global
/// state, so tests can run against as many roots as they like.
pub struct Storage {
    root: PathBuf,
    config: Config,
    pub legacy: LegacyStore,
    pub containers: ContainerStore,
    pub projects: crate::store::projects::ProjectStore,
    pub backups: BackupStore,
    index: LocationIndex,
    embedder: Option<Box<dyn Embedder>>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("legacy", &self.legacy)
            .field("containers", &self.containers)
            .field("projects", &self.projects)
            .field("backups", &self.backups)
            .field("index", &self.index)
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

impl Storage {
    /// Initialize a fresh storage root: directory skeleton, default config,
    /// the default project, and the three empty legacy collections.
    pub fn init(root: &Path) -> Result<Self> {
        if config::config_path(root).exists() {
            return Err(TendError::AlreadyInitialized(root.display().to_string()));
        }
        std::fs::create_dir_all(root.join("tasks"))?;
        std::fs::create_dir_all(root.join("project_tasks"))?;
        std::fs::create_dir_all(root.join("projects"))?;
        std::fs::create_dir_all(root.join("backups"))?;

        config::save(root, &Config::default())?;

        let storage = Self::open(root)?;
        storage
            .projects
            .save(&Project::new("general".into(), Some("General tasks".into())))?;
        storage.legacy.ensure_files()?;
        Ok(storage)
    }

    /// Open an existing storage root, refreshing the location index when the
    /// container directory has changed since it was last built.
    pub fn open(root: &Path) -> Result<Self> {
        if !config::config_path(root).exists() {
            return Err(TendError::NotInitialized(root.display().to_string()));
        }
        let config = config::load(root)?;
        let containers = ContainerStore::open(root);

        let index = LocationIndex::open(&root.join("index.db"))?;
        let fingerprint = containers.fingerprint()?;
        if index.get_fingerprint()?.as_deref() != Some(fingerprint.as_str()) {
            index.rebuild(&containers.list()?)?;
            index.set_fingerprint(&fingerprint)?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            config,
            legacy: LegacyStore::open(root),
            containers,
            projects: crate::store::projects::ProjectStore::open(root),
            backups: BackupStore::open(root),
            index,
            embedder: None,
        })
    }

    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn update_config(&mut self, config: Config) -> Result<()> {
        config::save(&self.root, &config)?;
        self.config = config;
        Ok(())
    }

    // -- tasks ------------------------------------------------------------

    /// Insert a task into its project's container, defaulting the project to
    /// the configured one when empty.
    pub fn add_task(&self, mut task: Task) -> Result<Task> {
        if task.parent_project.is_empty() {
            task.parent_project = self.config.default_project.clone();
        }
        task.normalize();
        self.maybe_embed(&mut task);

        let project = task.parent_project.clone();
        let stored = task.clone();
        self.containers.with_lock(&project, |container| {
            container.insert(task);
            Ok(())
        })?;
        self.refresh_index_for(&project);
        Ok(stored)
    }

    /// Fetch a task from a specific project's container.
    pub fn get_task(&self, project: &str, id: &str) -> Result<Task> {
        self.containers
            .load(project)?
            .get(id)
            .cloned()
            .ok_or_else(|| TendError::TaskNotFound(id.to_string()))
    }

    /// Fetch a task from any project. The location index is a fast path; a
    /// miss falls back to the linear scan over every container.
    pub fn get_task_anywhere(&self, id: &str) -> Result<Task> {
        if let Ok(Some((project, _))) = self.index.lookup(id)
            && let Ok(container) = self.containers.load(&project)
            && let Some(task) = container.get(id)
        {
            return Ok(task.clone());
        }
        for container in self.containers.list()? {
            if let Some(task) = container.get(id) {
                return Ok(task.clone());
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Apply a partial update to a task wherever it lives, regenerating its
    /// embedding when a provider is wired. The task stays in its current
    /// bucket: only the explicit lifecycle operations relocate (a status
    /// changed through here is exactly the drift `fix` repairs).
    pub fn update_task(&self, id: &str, updates: TaskUpdate) -> Result<Task> {
        for project in self.candidate_projects(id)? {
            let updated = self.containers.try_with_lock(&project, |container| {
                let Some(task) = container.get_mut(id) else {
                    return Ok(None);
                };
                task.apply(updates.clone())?;
                self.maybe_embed(task);
                Ok(Some(task.clone()))
            })?;
            if let Some(task) = updated {
                self.refresh_index_for(&project);
                return Ok(task);
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Soft-delete: force status to cancelled, stamp, and move the record to
    /// the `deleted` bucket of its container. Nothing is physically erased.
    pub fn delete_task(&self, id: &str) -> Result<Task> {
        for project in self.candidate_projects(id)? {
            let deleted = self.containers.try_with_lock(&project, |container| {
                let Some(mut task) = container.remove(id) else {
                    return Ok(None);
                };
                task.status = Status::Cancelled;
                task.updated_at = Utc::now();
                container.insert_deleted(task.clone());
                Ok(Some(task))
            })?;
            if let Some(task) = deleted {
                self.refresh_index_for(&project);
                return Ok(task);
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Complete a task out of `active` or `archived`. A task already in
    /// `completed` or `deleted` is not eligible and reports not-found.
    pub fn complete_task(&self, id: &str) -> Result<Task> {
        for project in self.candidate_projects(id)? {
            let completed = self.containers.try_with_lock(&project, |container| {
                let Some(mut task) = container.take_completable(id) else {
                    return Ok(None);
                };
                task.complete();
                container.insert(task.clone());
                Ok(Some(task))
            })?;
            if let Some(task) = completed {
                self.refresh_index_for(&project);
                return Ok(task);
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// Set a task in progress. `in_progress` maps to the active bucket, so a
    /// task already active stays put.
    pub fn start_task(&self, id: &str, assignee: Option<crate::model::Assignee>) -> Result<Task> {
        self.relocate_with_status(id, Status::InProgress, assignee)
    }

    /// Cancel a task, which archives it per the status mapping.
    pub fn cancel_task(&self, id: &str) -> Result<Task> {
        self.relocate_with_status(id, Status::Cancelled, None)
    }

    fn relocate_with_status(
        &self,
        id: &str,
        status: Status,
        assignee: Option<crate::model::Assignee>,
    ) -> Result<Task> {
        for project in self.candidate_projects(id)? {
            let moved = self.containers.try_with_lock(&project, |container| {
                let Some(mut task) = container.remove(id) else {
                    return Ok(None);
                };
                task.status = status;
                if let Some(assignee) = assignee.clone() {
                    task.assignee = Some(assignee);
                }
                task.updated_at = Utc::now();
                container.insert(task.clone());
                Ok(Some(task))
            })?;
            if let Some(task) = moved {
                self.refresh_index_for(&project);
                return Ok(task);
            }
        }
        Err(TendError::TaskNotFound(id.to_string()))
    }

    /// All tasks across every project container, bucket order within each
    /// container, containers in name order. Corrupt containers are skipped.
    pub fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>> {
        let mut all = Vec::new();
        for container in self.containers.list()? {
            all.extend(container.filtered(filters).into_iter().cloned());
        }
        Ok(all)
    }

    /// Tasks of a single project, all four buckets concatenated in order.
    pub fn list_project_tasks(&self, project: &str, filters: &TaskFilters) -> Result<Vec<Task>> {
        let container = self.containers.load(project)?;
        Ok(container.filtered(filters).into_iter().cloned().collect())
    }

    // -- projects ---------------------------------------------------------

    pub fn create_project(&self, name: String, description: Option<String>) -> Result<Project> {
        let project = Project::new(name, description);
        self.projects.save(&project)?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.projects.list()
    }

    pub fn archive_project(&self, name: &str) -> Result<Project> {
        let mut project = self.projects.load(name)?;
        project.archive();
        self.projects.save(&project)?;
        Ok(project)
    }

    pub fn complete_project(&self, name: &str) -> Result<Project> {
        let mut project = self.projects.load(name)?;
        project.complete();
        self.projects.save(&project)?;
        Ok(project)
    }

    pub fn delete_project(&self, name: &str) -> Result<()> {
        self.projects.delete(name)
    }

    /// Per-bucket counts for one project. An unknown project is simply an
    /// empty container: all zeros.
    pub fn project_stats(&self, project: &str) -> Result<ProjectStats> {
        Ok(self.containers.load(project)?.stats())
    }

    // -- maintenance ------------------------------------------------------

    /// One-shot, idempotent migration from the legacy flat store into the
    /// project container store.
    pub fn run_migration(&self, options: MigrationOptions) -> Result<crate::model::MigrationReport> {
        let report = migration::run(
            &self.legacy,
            &self.containers,
            &self.config.default_project,
            options,
        )?;
        self.rebuild_index();
        Ok(report)
    }

    /// Repair status/bucket drift in both stores.
    pub fn fix_consistency(&self) -> Result<crate::model::ConsistencyReport> {
        let report = consistency::fix_all(&self.legacy, &self.containers)?;
        self.rebuild_index();
        Ok(report)
    }

    pub fn create_backup(&self) -> Result<String> {
        self.backups.create()
    }

    pub fn list_backups(&self) -> Result<Vec<String>> {
        self.backups.list()
    }

    /// Restore a named snapshot (taking a fresh safety backup first), then
    /// reload config and index from the restored tree.
    pub fn restore_backup(&mut self, name: &str) -> Result<()> {
        self.backups.restore(name)?;
        self.config = config::load(&self.root)?;
        // The swap replaced index.db on disk; reopen before rebuilding so
        // the connection points at the restored file.
        self.index = LocationIndex::open(&self.root.join("index.db"))?;
        self.rebuild_index();
        Ok(())
    }

    // -- internals --------------------------------------------------------

    /// Projects to probe for a task id: the index's answer first, then every
    /// other container in name order.
    fn candidate_projects(&self, id: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if let Ok(Some((project, _))) = self.index.lookup(id) {
            names.push(project);
        }
        for name in self.containers.project_names()? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn prepare_embedding_text(task: &Task) -> String {
        let mut text = task.action.clone();
        if let Some(notes) = &task.context_notes {
            text.push(' ');
            text.push_str(notes);
        }
        if !task.tags.is_empty() {
            text.push(' ');
            text.push_str(&task.tags.join(" "));
        }
        text
    }

    /// Regenerate the embedding when a provider is wired. Best-effort: a
    /// failing embedding service never fails the task operation.
    fn maybe_embed(&self, task: &mut Task) {
        if let Some(embedder) = &self.embedder
            && let Ok(vector) = embedder.embed(&Self::prepare_embedding_text(task))
        {
            task.embedding_vector = Some(vector);
        }
    }

    /// Index maintenance is best-effort: an index failure degrades lookups to
    /// the linear scan instead of failing the operation.
    fn refresh_index_for(&self, project: &str) {
        let Ok(container) = self.containers.load(project) else {
            return;
        };
        let _ = self.index.upsert_container(&container);
        if let Ok(fingerprint) = self.containers.fingerprint() {
            let _ = self.index.set_fingerprint(&fingerprint);
        }
    }

    fn rebuild_index(&self) {
        let Ok(containers) = self.containers.list() else {
            return;
        };
        let _ = self.index.rebuild(&containers);
        if let Ok(fingerprint) = self.containers.fingerprint() {
            let _ = self.index.set_fingerprint(&fingerprint);
        }
    }
}
