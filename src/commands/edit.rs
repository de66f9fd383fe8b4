use std::path::Path;

use crate::error::{Result, TendError};
use crate::model::{Assignee, Priority, Status, TaskUpdate};
use crate::output::{self, Format};
use crate::store::engine::Storage;

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    id: &str,
    action: Option<String>,
    time: Option<String>,
    priority: Option<Priority>,
    project: Option<String>,
    status: Option<Status>,
    assignee: Option<String>,
    tags: Option<Vec<String>>,
    depends_on: Option<Vec<String>>,
    notes: Option<String>,
    progress: Option<u8>,
    format: Format,
) -> Result<()> {
    let storage = Storage::open(root)?;
    let updates = TaskUpdate {
        action,
        time,
        priority,
        parent_project: project,
        status,
        assignee: assignee.map(|a| Assignee::parse(&a)).transpose()?,
        tags,
        dependencies: depends_on,
        context_notes: notes,
        progress,
        embedding_vector: None,
    };
    if updates.is_empty() {
        return Err(TendError::InvalidArgument(
            "no fields to update; pass at least one flag".into(),
        ));
    }
    let task = storage.update_task(id, updates)?;
    output::print_task(&task, format)
}
