use std::path::Path;

use serde_json::json;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::engine::Storage;

pub fn add(
    root: &Path,
    name: String,
    description: Option<String>,
    format: Format,
) -> Result<()> {
    let storage = Storage::open(root)?;
    let project = storage.create_project(name, description)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&project)?),
        _ => println!("created project {}", project.name),
    }
    Ok(())
}

pub fn list(root: &Path, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let projects = storage.list_projects()?;
    output::print_projects(&projects, format)
}

pub fn stats(root: &Path, name: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let stats = storage.project_stats(name)?;
    output::print_stats(&stats, format)
}

pub fn archive(root: &Path, name: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let project = storage.archive_project(name)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&project)?),
        _ => println!("archived project {}", project.name),
    }
    Ok(())
}

pub fn complete(root: &Path, name: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let project = storage.complete_project(name)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&project)?),
        _ => println!("completed project {}", project.name),
    }
    Ok(())
}

pub fn delete(root: &Path, name: &str, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    storage.delete_project(name)?;
    match format {
        Format::Json => println!("{}", json!({ "deleted": name })),
        _ => println!("deleted project {name}"),
    }
    Ok(())
}
