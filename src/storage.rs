//! Whole-file JSON persistence shared by both stores.
//!
//! Files are written with 4-space indentation. A write goes to a sibling
//! temporary file that is flushed and synced before being renamed over the
//! target, so a crash mid-write leaves the previous contents intact.

use crate::error::{AtmError, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Loads `T` from `path`, or creates the file from `T::default()` when it
/// does not exist yet.
pub fn load_or_init<T>(path: &Path) -> Result<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    if !path.exists() {
        info!("{} not found, initializing empty store", path.display());
        let value = T::default();
        write_atomic(path, &value)?;
        return Ok(value);
    }

    let file = File::open(path).map_err(|e| AtmError::storage(path, e))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AtmError::storage(path, e))?;
    info!("Loaded {}", path.display());
    Ok(value)
}

/// Serializes `value` and atomically replaces the file at `path`.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = tmp_path(path);
    write_file(&tmp, value).map_err(|e| AtmError::storage(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| AtmError::storage(path, e))?;
    debug!("Persisted {}", path.display());
    Ok(())
}

fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
