//! services/cli/src/storage.rs
//!
//! Keeps the active reading session in `reading-session.json` so it survives
//! between `reader` invocations.

use reading_tracker_core::{ActiveSession, PortError, PortResult, SessionStorage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SESSION_FILE: &str = "reading-session.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unreadable reading session record {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<StorageError> for PortError {
    fn from(e: StorageError) -> Self {
        PortError::Unexpected(e.to_string())
    }
}

/// On-disk shape. Unknown fields are ignored and a missing `session` reads
/// as none.
#[derive(Debug, Default, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    session: Option<ActiveSession>,
}

#[derive(Serialize)]
struct StoredRecordRef<'a> {
    session: Option<&'a ActiveSession>,
}

#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> Result<Option<ActiveSession>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let record: StoredRecord =
            serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(record.session)
    }

    /// Writes to a sibling file and renames it over the record, so a crash
    /// mid-write leaves the previous record intact.
    fn write(&self, session: Option<&ActiveSession>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(&StoredRecordRef { session }).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!("Saved reading session record to {}", self.path.display());
        Ok(())
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> PortResult<Option<ActiveSession>> {
        Ok(self.read()?)
    }

    fn save(&self, session: Option<&ActiveSession>) -> PortResult<()> {
        Ok(self.write(session)?)
    }
}
