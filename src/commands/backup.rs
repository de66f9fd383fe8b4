use std::path::Path;

use serde_json::json;

use crate::error::Result;
use crate::output::Format;
use crate::store::engine::Storage;

pub fn create(root: &Path, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let name = storage.create_backup()?;
    match format {
        Format::Json => println!("{}", json!({ "backup": name })),
        _ => println!("created backup {name}"),
    }
    Ok(())
}

pub fn list(root: &Path, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let backups = storage.list_backups()?;
    match format {
        Format::Json => println!("{}", serde_json::to_string(&backups)?),
        _ => {
            for name in backups {
                println!("{name}");
            }
        }
    }
    Ok(())
}

pub fn restore(root: &Path, name: &str, format: Format) -> Result<()> {
    let mut storage = Storage::open(root)?;
    storage.restore_backup(name)?;
    match format {
        Format::Json => println!("{}", json!({ "restored": name })),
        _ => println!("restored backup {name}"),
    }
    Ok(())
}
