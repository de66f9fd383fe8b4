use std::path::Path;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::engine::Storage;

pub fn run(root: &Path, id: &str, project: Option<String>, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let task = match project {
        Some(project) => storage.get_task(&project, id)?,
        None => storage.get_task_anywhere(id)?,
    };
    output::print_task(&task, format)
}
