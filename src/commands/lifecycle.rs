use std::path::Path;

use crate::error::Result;
use crate::model::Assignee;
use crate::output::{self, Format};
use crate::store::engine::Storage;

pub fn start(root: &Path, id: &str, assignee: Option<String>, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let assignee = assignee.map(|a| Assignee::parse(&a)).transpose()?;
    let task = storage.start_task(id, assignee)?;
    output::print_task(&task, format)
}

pub fn done(root: &Path, id: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let task = storage.complete_task(id)?;
    output::print_task(&task, format)
}

pub fn cancel(root: &Path, id: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let task = storage.cancel_task(id)?;
    output::print_task(&task, format)
}

pub fn delete(root: &Path, id: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let task = storage.delete_task(id)?;
    output::print_task(&task, format)
}
