use std::path::Path;

use crate::error::Result;
use crate::model::{Assignee, Priority, Status, TaskFilters};
use crate::output::{self, Format};
use crate::store::engine::Storage;

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    project: Option<String>,
    status: Option<Status>,
    priority: Option<Priority>,
    assignee: Option<String>,
    tags: Vec<String>,
    search: Option<String>,
    format: Format,
) -> Result<()> {
    let storage = Storage::open(root)?;
    let filters = TaskFilters {
        project: project.clone(),
        status,
        priority,
        assignee: assignee.map(|a| Assignee::parse(&a)).transpose()?,
        tags: if tags.is_empty() { None } else { Some(tags) },
        search,
    };

    let tasks = match &project {
        Some(project) => storage.list_project_tasks(project, &filters)?,
        None => storage.list_tasks(&filters)?,
    };
    output::print_tasks(&tasks, format)
}
