use std::path::Path;

use serde_json::json;

use crate::error::Result;
use crate::output::Format;
use crate::store::engine::Storage;

pub fn run(root: &Path, format: Format) -> Result<()> {
    let storage = Storage::init(root)?;
    match format {
        Format::Json => println!(
            "{}",
            json!({ "initialized": storage.root().display().to_string() })
        ),
        _ => println!("initialized storage at {}", storage.root().display()),
    }
    Ok(())
}
