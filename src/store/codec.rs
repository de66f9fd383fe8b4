use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, TendError};

/// Write a record as pretty-printed JSON, creating parent directories on
/// first write.
pub fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a record. `Ok(None)` means the file does not exist; a file that
/// exists but does not parse is reported as `Corrupt` so callers can decide
/// between best-effort skipping and hard failure.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    match serde_json::from_str(&data) {
        Ok(value) => Ok(Some(value)),
        Err(err) => Err(TendError::Corrupt {
            path: path.display().to_string(),
            detail: err.to_string(),
        }),
    }
}

/// Read only the `revision` stamp of a versioned record, for the
/// compare-at-save conflict check.
pub fn read_revision(path: &Path) -> Result<Option<u64>> {
    let value: Option<serde_json::Value> = read_record(path)?;
    Ok(value.and_then(|v| v.get("revision").and_then(|r| r.as_u64())))
}
