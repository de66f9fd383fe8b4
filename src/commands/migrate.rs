use std::path::Path;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::engine::Storage;
use crate::store::migration::MigrationOptions;

pub fn run(root: &Path, dry_run: bool, cleanup: bool, format: Format) -> Result<()> {
    let storage = Storage::open(root)?;
    let report = storage.run_migration(MigrationOptions { dry_run, cleanup })?;
    output::print_migration_report(&report, format)
}
