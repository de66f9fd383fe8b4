use std::path::Path;

use crate::error::Result;
use crate::model::{Assignee, Priority, Status, Task};
use crate::output::{self, Format};
use crate::store::engine::Storage;

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    action: String,
    time: Option<String>,
    priority: Priority,
    project: Option<String>,
    status: Status,
    assignee: Option<String>,
    tags: Vec<String>,
    depends_on: Vec<String>,
    notes: Option<String>,
    progress: Option<u8>,
    format: Format,
) -> Result<()> {
    let storage = Storage::open(root)?;
    let assignee = assignee.map(|a| Assignee::parse(&a)).transpose()?;
    let task = Task::with_details(
        action,
        time.unwrap_or_default(),
        priority,
        project.unwrap_or_default(),
        status,
        assignee,
        tags,
        depends_on,
        notes,
        progress,
    )?;
    let stored = storage.add_task(task)?;
    output::print_task(&stored, format)
}
