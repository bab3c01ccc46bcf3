//! Crash-safe JSON file helpers.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PersistenceError, Result};

/// Serializes `value` and replaces `path` with it atomically.
///
/// Data goes to a temp file in the same directory first and is then renamed
/// over the target, so readers see either the old or the new record.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(PersistenceError::io("create directory", dir))?;

    let json = serde_json::to_vec_pretty(value)?;

    let mut temp =
        tempfile::NamedTempFile::new_in(dir).map_err(PersistenceError::io("write", path))?;
    temp.write_all(&json)
        .and_then(|()| temp.flush())
        .map_err(PersistenceError::io("write", path))?;
    temp.persist(path)
        .map_err(|e| PersistenceError::io("rename into", path)(e.error))?;

    Ok(())
}

/// Reads a JSON record, returning `None` if the file does not exist.
pub fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::io("read", path)(e)),
    }
}

/// Reads every `*.json` record in `dir`.
///
/// Unreadable records are logged and skipped so one corrupt file does not
/// hide the rest. A missing directory yields an empty list.
pub fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PersistenceError::io("list", dir)(e)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let path = entry.map_err(PersistenceError::io("list", dir))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match read_json_optional(&path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record"),
        }
    }

    Ok(records)
}
