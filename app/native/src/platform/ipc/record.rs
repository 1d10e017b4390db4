//! Persisted record of the bound command channel address.
//!
//! The primary writes the record after its command channel starts so that
//! clients launched later (possibly with a different configuration) can find
//! it again. The record is removed on clean shutdown.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::transport::remove_if_exists;
use crate::core::constants::config::ENDPOINT_RECORD_FILE;

/// Address details of a running command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Logical command channel name.
    pub name: String,
    /// Process id of the primary that owns the channel.
    pub pid: u32,
    /// Scheme the primary dispatches.
    pub scheme: String,
}

impl EndpointRecord {
    /// Creates a record for the current process.
    pub fn for_current_process(name: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pid: std::process::id(),
            scheme: scheme.into(),
        }
    }

    /// Location of the record inside `state_dir`.
    #[must_use]
    pub fn path(state_dir: &Path) -> PathBuf { state_dir.join(ENDPOINT_RECORD_FILE) }

    /// Writes the record, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write(&self, state_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(state_dir)?;
        let path = Self::path(state_dir);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, &path)
    }

    /// Reads the record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no primary has recorded itself, or `InvalidData`
    /// for a corrupted record.
    pub fn read(state_dir: &Path) -> io::Result<Self> {
        let contents = fs::read(Self::path(state_dir))?;
        serde_json::from_slice(&contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    /// Removes the record if it still belongs to this process.
    pub fn remove_own(state_dir: &Path) {
        match Self::read(state_dir) {
            Ok(record) if record.pid == std::process::id() => {
                if let Err(err) = remove_if_exists(&Self::path(state_dir)) {
                    tracing::warn!(error = %err, "failed to remove endpoint record");
                }
            }
            _ => {}
        }
    }
}
