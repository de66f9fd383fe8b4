use thiserror::Error;

#[derive(Debug, Error)]
pub enum TendError {
    #[error("storage not initialized at {0} (run `tend init` first)")]
    NotInitialized(String),

    #[error("storage already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("project {0} not found")]
    ProjectNotFound(String),

    #[error("backup {0} not found")]
    BackupNotFound(String),

    #[error("corrupt record at {path}: {detail}")]
    Corrupt { path: String, detail: String },

    #[error("write conflict on {0}: record changed since it was loaded")]
    Conflict(String),

    #[error("lock contention on {0}: timed out waiting for exclusive access")]
    Contention(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index error: {0}")]
    Index(#[from] rusqlite::Error),
}

impl TendError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized(_) => "not_initialized",
            Self::AlreadyInitialized(_) => "already_initialized",
            Self::TaskNotFound(_) => "task_not_found",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::BackupNotFound(_) => "backup_not_found",
            Self::Corrupt { .. } => "corrupt",
            Self::Conflict(_) => "conflict",
            Self::Contention(_) => "contention",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Index(_) => "index_error",
        }
    }

    pub fn invalid_progress(progress: u8) -> Self {
        Self::InvalidArgument(format!("progress {progress} is out of range (0-100)"))
    }
}

pub type Result<T> = std::result::Result<T, TendError>;
