use std::path::Path;

use colored::Colorize;
use serde_json::json;

use crate::error::Result;
use crate::output::Format;
use crate::store::engine::Storage;

pub fn run(root: &Path, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let report = storage.fix_consistency()?;
    match format {
        Format::Json => println!(
            "{}",
            json!({ "fixed": report.fixed, "task_ids": report.task_ids })
        ),
        _ => {
            if report.fixed == 0 {
                println!("{}  no drift found", " ok ".green());
            } else {
                for id in &report.task_ids {
                    println!("{}  moved {id} to completed", "fix ".yellow());
                }
                println!("fixed {} drifted task(s)", report.fixed);
            }
        }
    }
    Ok(())
}
