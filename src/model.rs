use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, TendError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    Urgent,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    Pending,
    InProgress,
    Blocked,
    Review,
    Done,
    Completed,
    Cancelled,
    Deferred,
}

/// The lifecycle bucket a task physically resides in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Active,
    Completed,
    Archived,
    Deleted,
}

impl Status {
    /// The bucket a task with this status belongs in. The `deleted` bucket is
    /// never selected by status; only an explicit delete puts a task there.
    pub fn bucket(self) -> Bucket {
        match self {
            Self::Todo | Self::Pending | Self::InProgress | Self::Blocked | Self::Review => {
                Bucket::Active
            }
            Self::Done | Self::Completed => Bucket::Completed,
            Self::Cancelled | Self::Deferred => Bucket::Archived,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Completed)
    }
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Review => "review",
            Self::Done => "done",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Deferred => "deferred",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

/// Who a task is assigned to. Anything beyond the three fixed kinds is a
/// named agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignee {
    Human,
    Ai,
    Collaborative,
    Agent(String),
}

impl Assignee {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TendError::InvalidArgument(
                "assignee cannot be empty".into(),
            ));
        }
        Ok(match trimmed {
            "human" => Self::Human,
            "ai" => Self::Ai,
            "collaborative" => Self::Collaborative,
            other => Self::Agent(other.to_string()),
        })
    }
}

impl std::fmt::Display for Assignee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Ai => f.write_str("ai"),
            Self::Collaborative => f.write_str("collaborative"),
            Self::Agent(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub time: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub parent_project: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_vector: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        action: String,
        time: String,
        priority: Priority,
        parent_project: String,
        status: Status,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_task_id(),
            action,
            time,
            priority,
            status,
            assignee: None,
            parent_project,
            tags: Vec::new(),
            dependencies: Vec::new(),
            context_notes: None,
            progress: None,
            embedding_vector: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_details(
        action: String,
        time: String,
        priority: Priority,
        parent_project: String,
        status: Status,
        assignee: Option<Assignee>,
        tags: Vec<String>,
        dependencies: Vec<String>,
        context_notes: Option<String>,
        progress: Option<u8>,
    ) -> Result<Self> {
        if let Some(progress) = progress
            && progress > 100
        {
            return Err(TendError::invalid_progress(progress));
        }
        let mut task = Self::new(action, time, priority, parent_project, status);
        task.assignee = assignee;
        task.tags = tags;
        task.dependencies = dependencies;
        task.context_notes = context_notes;
        task.progress = progress;
        task.normalize();
        Ok(task)
    }

    /// Apply a partial update, refreshing `updated_at`. Progress above 100 is
    /// rejected before anything is touched.
    pub fn apply(&mut self, updates: TaskUpdate) -> Result<()> {
        if let Some(progress) = updates.progress
            && progress > 100
        {
            return Err(TendError::invalid_progress(progress));
        }
        if let Some(action) = updates.action {
            self.action = action;
        }
        if let Some(time) = updates.time {
            self.time = time;
        }
        if let Some(priority) = updates.priority {
            self.priority = priority;
        }
        if let Some(parent_project) = updates.parent_project {
            self.parent_project = parent_project;
        }
        if let Some(status) = updates.status {
            self.status = status;
        }
        if let Some(assignee) = updates.assignee {
            self.assignee = Some(assignee);
        }
        if let Some(tags) = updates.tags {
            self.tags = tags;
        }
        if let Some(dependencies) = updates.dependencies {
            self.dependencies = dependencies;
        }
        if let Some(context_notes) = updates.context_notes {
            self.context_notes = Some(context_notes);
        }
        if let Some(progress) = updates.progress {
            self.progress = Some(progress);
        }
        if let Some(vector) = updates.embedding_vector {
            self.embedding_vector = Some(vector);
        }
        self.normalize();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark done with full progress.
    pub fn complete(&mut self) {
        self.status = Status::Done;
        self.progress = Some(100);
        self.updated_at = Utc::now();
    }

    /// Trim whitespace and drop empty tags, then deduplicate and sort for
    /// deterministic storage. Dependencies keep their caller-given order.
    pub fn normalize(&mut self) {
        for tag in &mut self.tags {
            let trimmed = tag.trim();
            if trimmed.len() != tag.len() {
                *tag = trimmed.to_string();
            }
        }
        self.tags.retain(|t| !t.is_empty());
        self.tags.sort();
        self.tags.dedup();

        self.dependencies.retain(|d| !d.trim().is_empty());
        let mut seen = std::collections::HashSet::new();
        self.dependencies.retain(|d| seen.insert(d.clone()));
    }
}

fn new_task_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("task_{}", &hex[..8])
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub action: Option<String>,
    pub time: Option<String>,
    pub priority: Option<Priority>,
    pub parent_project: Option<String>,
    pub status: Option<Status>,
    pub assignee: Option<Assignee>,
    pub tags: Option<Vec<String>>,
    pub dependencies: Option<Vec<String>>,
    pub context_notes: Option<String>,
    pub progress: Option<u8>,
    pub embedding_vector: Option<Vec<f32>>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: String) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_time(mut self, time: String) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_parent_project(mut self, parent_project: String) -> Self {
        self.parent_project = Some(parent_project);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = Some(assignee);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn with_context_notes(mut self, context_notes: String) -> Self {
        self.context_notes = Some(context_notes);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_none()
            && self.time.is_none()
            && self.priority.is_none()
            && self.parent_project.is_none()
            && self.status.is_none()
            && self.assignee.is_none()
            && self.tags.is_none()
            && self.dependencies.is_none()
            && self.context_notes.is_none()
            && self.progress.is_none()
            && self.embedding_vector.is_none()
    }
}

#[derive(Debug, Default, Clone)]
pub struct TaskFilters {
    pub project: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assignee: Option<Assignee>,
    pub tags: Option<Vec<String>>,
    pub search: Option<String>,
}

impl TaskFilters {
    /// Single filtering predicate shared by both stores: project, status,
    /// priority and assignee are exact matches, tags intersect, and search is
    /// a case-insensitive substring match over action and context notes.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project) = &self.project
            && task.parent_project != *project
        {
            return false;
        }
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if let Some(assignee) = &self.assignee
            && task.assignee.as_ref() != Some(assignee)
        {
            return false;
        }
        if let Some(tags) = &self.tags
            && !tags.iter().any(|tag| task.tags.contains(tag))
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_action = task.action.to_lowercase().contains(&needle);
            let in_notes = task
                .context_notes
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            if !in_action && !in_notes {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
    Completed,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Legacy association list. Canonical membership is a task's
    /// `parent_project` field; this list may be stale.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<String>,
}

impl Project {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            name,
            description,
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        }
    }

    pub fn archive(&mut self) {
        self.status = ProjectStatus::Archived;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.status = ProjectStatus::Completed;
        self.updated_at = Utc::now();
    }
}

/// Schema version stamped into collection and container records.
pub const SCHEMA_VERSION: &str = "1";

/// One of the three named legacy collections, serialized as a single file
/// holding a map of task id to task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCollection {
    pub version: String,
    /// Write stamp bumped on every save; a mismatch at save time means some
    /// other writer slipped outside the lock protocol.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tasks: BTreeMap<String, Task>,
}

impl TaskCollection {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: SCHEMA_VERSION.to_string(),
            revision: 0,
            created_at: now,
            updated_at: now,
            tasks: BTreeMap::new(),
        }
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
        self.updated_at = Utc::now();
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn get_task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn remove_task(&mut self, id: &str) -> Option<Task> {
        let task = self.tasks.remove(id);
        if task.is_some() {
            self.updated_at = Utc::now();
        }
        task
    }

    pub fn filtered(&self, filters: &TaskFilters) -> Vec<&Task> {
        self.tasks.values().filter(|t| filters.matches(t)).collect()
    }
}

impl Default for TaskCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-project aggregate holding the four lifecycle buckets. A task id lives
/// in at most one bucket; every relocation is remove-then-insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContainer {
    pub project_name: String,
    /// Content hash of the project name, computed once at creation and used
    /// as the container's filename.
    pub project_hash: String,
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active_tasks: BTreeMap<String, Task>,
    pub completed_tasks: BTreeMap<String, Task>,
    pub archived_tasks: BTreeMap<String, Task>,
    pub deleted_tasks: BTreeMap<String, Task>,
}

impl ProjectContainer {
    pub fn new(project_name: &str) -> Self {
        let now = Utc::now();
        Self {
            project_name: project_name.to_string(),
            project_hash: hash_project_name(project_name),
            revision: 0,
            created_at: now,
            updated_at: now,
            active_tasks: BTreeMap::new(),
            completed_tasks: BTreeMap::new(),
            archived_tasks: BTreeMap::new(),
            deleted_tasks: BTreeMap::new(),
        }
    }

    pub fn bucket(&self, bucket: Bucket) -> &BTreeMap<String, Task> {
        match bucket {
            Bucket::Active => &self.active_tasks,
            Bucket::Completed => &self.completed_tasks,
            Bucket::Archived => &self.archived_tasks,
            Bucket::Deleted => &self.deleted_tasks,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut BTreeMap<String, Task> {
        match bucket {
            Bucket::Active => &mut self.active_tasks,
            Bucket::Completed => &mut self.completed_tasks,
            Bucket::Archived => &mut self.archived_tasks,
            Bucket::Deleted => &mut self.deleted_tasks,
        }
    }

    /// Insert a task into the bucket selected by its status, removing any
    /// previous occurrence of the id first.
    pub fn insert(&mut self, task: Task) {
        self.remove(&task.id);
        let bucket = task.status.bucket();
        self.bucket_mut(bucket).insert(task.id.clone(), task);
        self.updated_at = Utc::now();
    }

    /// Insert directly into the deleted bucket, ignoring the status mapping.
    pub fn insert_deleted(&mut self, task: Task) {
        self.remove(&task.id);
        self.deleted_tasks.insert(task.id.clone(), task);
        self.updated_at = Utc::now();
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.active_tasks
            .get(id)
            .or_else(|| self.completed_tasks.get(id))
            .or_else(|| self.archived_tasks.get(id))
            .or_else(|| self.deleted_tasks.get(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        if self.active_tasks.contains_key(id) {
            return self.active_tasks.get_mut(id);
        }
        if self.completed_tasks.contains_key(id) {
            return self.completed_tasks.get_mut(id);
        }
        if self.archived_tasks.contains_key(id) {
            return self.archived_tasks.get_mut(id);
        }
        self.deleted_tasks.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let task = self
            .active_tasks
            .remove(id)
            .or_else(|| self.completed_tasks.remove(id))
            .or_else(|| self.archived_tasks.remove(id))
            .or_else(|| self.deleted_tasks.remove(id));
        if task.is_some() {
            self.updated_at = Utc::now();
        }
        task
    }

    /// Remove the task only if it sits in `active` or `archived`, the two
    /// buckets a completion may move it out of.
    pub fn take_completable(&mut self, id: &str) -> Option<Task> {
        let task = self
            .active_tasks
            .remove(id)
            .or_else(|| self.archived_tasks.remove(id));
        if task.is_some() {
            self.updated_at = Utc::now();
        }
        task
    }

    pub fn bucket_of(&self, id: &str) -> Option<Bucket> {
        for bucket in [
            Bucket::Active,
            Bucket::Completed,
            Bucket::Archived,
            Bucket::Deleted,
        ] {
            if self.bucket(bucket).contains_key(id) {
                return Some(bucket);
            }
        }
        None
    }

    /// All tasks in bucket order: active, completed, archived, deleted.
    pub fn all_tasks(&self) -> Vec<&Task> {
        let mut all = Vec::with_capacity(self.len());
        all.extend(self.active_tasks.values());
        all.extend(self.completed_tasks.values());
        all.extend(self.archived_tasks.values());
        all.extend(self.deleted_tasks.values());
        all
    }

    pub fn filtered(&self, filters: &TaskFilters) -> Vec<&Task> {
        self.all_tasks()
            .into_iter()
            .filter(|t| filters.matches(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.active_tasks.len()
            + self.completed_tasks.len()
            + self.archived_tasks.len()
            + self.deleted_tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ProjectStats {
        ProjectStats {
            project_name: self.project_name.clone(),
            total_tasks: self.len(),
            active_tasks: self.active_tasks.len(),
            completed_tasks: self.completed_tasks.len(),
            archived_tasks: self.archived_tasks.len(),
            deleted_tasks: self.deleted_tasks.len(),
        }
    }
}

/// Stable content hash of a project name, shared by the container store and
/// the migration engine: lowercase hex SHA-256 of the trimmed name.
pub fn hash_project_name(project_name: &str) -> String {
    let digest = Sha256::digest(project_name.trim().as_bytes());
    format!("{digest:x}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectStats {
    pub project_name: String,
    pub total_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub archived_tasks: usize,
    pub deleted_tasks: usize,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub tasks_found: usize,
    pub tasks_migrated: usize,
    pub projects_migrated: usize,
    pub project_stats: Vec<ProjectMigrationStats>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMigrationStats {
    pub project_name: String,
    pub initial_tasks: usize,
    pub migrated_tasks: usize,
    pub final_tasks: usize,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub fixed: usize,
    pub task_ids: Vec<String>,
}

/// Small config/registration record consumed by the other components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub default_project: String,
    pub auto_backup: bool,
    pub backup_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_assignee: Option<Assignee>,
    pub date_format: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            default_project: "general".to_string(),
            auto_backup: true,
            backup_interval: "daily".to_string(),
            default_assignee: Some(Assignee::Collaborative),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            timezone: "UTC".to_string(),
            registration: None,
        }
    }
}

/// Optional remote registration record. Inert at this layer: it only
/// round-trips; talking to a server is someone else's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub user_name: String,
    pub user_email: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub server_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task::new(
            "Write the report".into(),
            "2h".into(),
            Priority::High,
            "general".into(),
            Status::Todo,
        )
    }

    #[test]
    fn task_round_trips_json() {
        let mut task = sample_task();
        task.assignee = Some(Assignee::Agent("scribe".into()));
        task.tags = vec!["docs".into()];
        task.progress = Some(40);

        let json = serde_json::to_string_pretty(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task, parsed);
    }

    #[test]
    fn timestamps_round_trip_exactly() {
        let task = sample_task();
        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task.created_at, parsed.created_at);
        assert_eq!(task.updated_at, parsed.updated_at);

        let rejson = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, rejson);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
    }

    #[test]
    fn status_bucket_mapping() {
        for status in [
            Status::Todo,
            Status::Pending,
            Status::InProgress,
            Status::Blocked,
            Status::Review,
        ] {
            assert_eq!(status.bucket(), Bucket::Active);
        }
        assert_eq!(Status::Done.bucket(), Bucket::Completed);
        assert_eq!(Status::Completed.bucket(), Bucket::Completed);
        assert_eq!(Status::Cancelled.bucket(), Bucket::Archived);
        assert_eq!(Status::Deferred.bucket(), Bucket::Archived);
    }

    #[test]
    fn progress_above_100_rejected() {
        let mut task = sample_task();
        let err = task
            .apply(TaskUpdate::new().with_progress(101))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
        assert_eq!(task.progress, None);

        task.apply(TaskUpdate::new().with_progress(100)).unwrap();
        assert_eq!(task.progress, Some(100));
    }

    #[test]
    fn apply_refreshes_updated_at() {
        let mut task = sample_task();
        let before = task.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        task.apply(TaskUpdate::new().with_action("Edited".into()))
            .unwrap();
        assert!(task.updated_at > before);
        assert_eq!(task.action, "Edited");
    }

    #[test]
    fn container_insert_is_exclusive() {
        let mut container = ProjectContainer::new("general");
        let mut task = sample_task();
        let id = task.id.clone();
        container.insert(task.clone());
        assert_eq!(container.bucket_of(&id), Some(Bucket::Active));

        task.status = Status::Done;
        container.insert(task);
        assert_eq!(container.bucket_of(&id), Some(Bucket::Completed));
        assert!(!container.active_tasks.contains_key(&id));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn take_completable_ignores_completed_and_deleted() {
        let mut container = ProjectContainer::new("general");
        let mut done = sample_task();
        done.status = Status::Done;
        let done_id = done.id.clone();
        container.insert(done);
        assert!(container.take_completable(&done_id).is_none());

        let mut gone = sample_task();
        let gone_id = gone.id.clone();
        gone.status = Status::Cancelled;
        container.insert_deleted(gone);
        assert!(container.take_completable(&gone_id).is_none());

        let deferred = {
            let mut t = sample_task();
            t.status = Status::Deferred;
            t
        };
        let deferred_id = deferred.id.clone();
        container.insert(deferred);
        assert!(container.take_completable(&deferred_id).is_some());
    }

    #[test]
    fn filters_match_tags_and_search() {
        let mut task = sample_task();
        task.tags = vec!["backend".into(), "urgent".into()];
        task.context_notes = Some("Needs the Q3 numbers".into());

        let mut filters = TaskFilters::default();
        filters.tags = Some(vec!["frontend".into(), "backend".into()]);
        assert!(filters.matches(&task));

        filters.tags = Some(vec!["frontend".into()]);
        assert!(!filters.matches(&task));

        let mut filters = TaskFilters::default();
        filters.search = Some("q3 NUMBERS".into());
        assert!(filters.matches(&task));

        filters.search = Some("missing".into());
        assert!(!filters.matches(&task));
    }

    #[test]
    fn project_hash_is_stable_and_trimmed() {
        let a = hash_project_name("general");
        let b = hash_project_name("  general  ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_project_name("other"));
    }

    #[test]
    fn assignee_parses_named_agent() {
        assert_eq!(Assignee::parse("human").unwrap(), Assignee::Human);
        assert_eq!(
            Assignee::parse("planner").unwrap(),
            Assignee::Agent("planner".into())
        );
        assert!(Assignee::parse("  ").is_err());
    }

    #[test]
    fn normalize_trims_and_dedups() {
        let mut task = sample_task();
        task.tags = vec![" x ".into(), "x".into(), "".into(), "a".into()];
        task.dependencies = vec!["task_1".into(), "task_1".into(), " ".into()];
        task.normalize();
        assert_eq!(task.tags, vec!["a", "x"]);
        assert_eq!(task.dependencies, vec!["task_1"]);
    }
}
