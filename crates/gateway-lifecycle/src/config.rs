//! Local record of the gateway this caller manages.

use std::path::{Path, PathBuf};

use crate::error::{LifecycleError, Result};
use crate::model::{GatewayRecord, RecordFile};

/// File name used when the caller does not pick one.
pub const DEFAULT_RECORD_FILE: &str = "gateway.config";

/// Reads and writes the single `{"gateway": {...}}` record.
///
/// The file is not locked; concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<GatewayRecord>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LifecycleError::ReadFile {
                    path: self.display(),
                    source,
                });
            }
        };
        let file: RecordFile =
            serde_json::from_slice(&bytes).map_err(|source| LifecycleError::ParseFile {
                path: self.display(),
                source,
            })?;
        Ok(Some(file.gateway))
    }

    /// Replace any existing record with `gateway`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the parent directory or file cannot be written.
    pub fn save(&self, gateway: &GatewayRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LifecycleError::WriteFile {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let file = RecordFile {
            gateway: gateway.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|source| LifecycleError::ParseFile {
            path: self.display(),
            source,
        })?;
        std::fs::write(&self.path, bytes).map_err(|source| LifecycleError::WriteFile {
            path: self.display(),
            source,
        })?;
        Ok(())
    }

    /// Delete the record file. Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file exists but cannot be removed.
    pub fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LifecycleError::WriteFile {
                path: self.display(),
                source,
            }),
        }
    }

    /// Pick the gateway to operate on: the explicit id if given, else the recorded one.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither is available.
    pub fn resolve_gateway_id(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(id) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(id.to_string());
        }
        match self.load()? {
            Some(record) => {
                tracing::debug!(gateway_id = %record.id, path = %self.display(), "using recorded gateway");
                Ok(record.id)
            }
            None => Err(LifecycleError::Config(format!(
                "no gateway id provided and no record found in {}",
                self.display()
            ))),
        }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_FILE)
    }
}
