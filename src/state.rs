//! Flat-file persistence for the price snapshot and last-checked marker.
//!
//! Both documents are small JSON files overwritten wholesale at the end of a
//! successful run. A missing file is normal (first run); a file that exists
//! but does not parse is an error.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};
use crate::models::{LastCheckedMarker, PriceSnapshot};

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Reads and writes the two state documents.
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Path of the `{"<sku>": <cost>}` snapshot.
    pub price_history_file: PathBuf,
    /// Path of the `{"last_checked": "..."}` marker.
    pub last_checked_file: PathBuf,
}

impl StateStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(price_history_file: P, last_checked_file: Q) -> Self {
        Self {
            price_history_file: price_history_file.into(),
            last_checked_file: last_checked_file.into(),
        }
    }

    /// Lower bound for the next fetch.
    ///
    /// Falls back to the current UTC time when there is no marker file, or
    /// the file has no `last_checked` entry.
    pub fn get_last_checked(&self) -> Result<DateTime<Utc>> {
        let marker: Option<LastCheckedMarker> = read_json(&self.last_checked_file)?;
        match marker.and_then(|m| m.instant()) {
            Some(instant) => Ok(instant),
            None => {
                debug!(
                    path = %self.last_checked_file.display(),
                    "no last-checked marker, starting from now"
                );
                Ok(Utc::now())
            }
        }
    }

    /// Overwrite the marker with `now`.
    pub fn save_last_checked(&self, now: DateTime<Utc>) -> Result<()> {
        write_json(&self.last_checked_file, &LastCheckedMarker::at(now))
    }

    /// Load the snapshot, or an empty one if the file does not exist.
    pub fn load_prices(&self) -> Result<PriceSnapshot> {
        Ok(read_json(&self.price_history_file)?.unwrap_or_default())
    }

    /// Overwrite the snapshot file with `prices`.
    pub fn save_prices(&self, prices: &PriceSnapshot) -> Result<()> {
        write_json(&self.price_history_file, prices)
    }
}

/// Parse a JSON file, returning `None` if it does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents).map(Some).map_err(|e| {
        warn!(path = %path.display(), error = %e, "state file is not valid JSON");
        MonitorError::from(e)
    })
}

/// Write a JSON file through a temp file in the same directory, so an
/// interrupted write never leaves a truncated document behind.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)?;
            parent.to_path_buf()
        }
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| MonitorError::Io(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// RunLock
// ---------------------------------------------------------------------------

/// Exclusive marker that a run is in progress.
///
/// Held for the duration of a run and removed on drop. A lock left behind by
/// a crashed process must be removed by hand.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(MonitorError::AlreadyRunning(path));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!(path = %path.display(), "acquired run lock");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        }
    }
}
