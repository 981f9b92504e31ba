// SPDX-License-Identifier: AGPL-3.0-or-later

//! File-backed secret store.
//!
//! Secrets are plain files under a root directory; the secret name maps to a
//! relative path (`fabric/orgs/<org>/<user>/pk` becomes that path under the
//! root). Deployments point the root at an encrypted mount; this module uses
//! normal filesystem I/O and does not implement any crypto itself.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CreateOutcome, SecretStore, SecretStoreError};

/// Secret store over a directory tree.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
    initialized: bool,
}

impl FileSecretStore {
    /// Create a store rooted at `root`.
    ///
    /// Does NOT create the directory structure. Call `initialize()` first.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            initialized: false,
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory. Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        self.initialized = true;
        Ok(())
    }

    /// Map a secret name to its backing file path.
    ///
    /// Path traversal segments are rejected rather than resolved.
    fn secret_path(&self, name: &str) -> Result<PathBuf, SecretStoreError> {
        if name.is_empty() || name.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(SecretStoreError::Unavailable(format!(
                "malformed secret name: {name}"
            )));
        }
        Ok(self.root.join(name))
    }

    /// Uses `File::open` rather than `Path::exists`; some encrypted mounts
    /// fail `stat()` on files that open and read correctly.
    fn exists(&self, path: &Path) -> bool {
        File::open(path).is_ok()
    }
}

fn unavailable(e: io::Error) -> SecretStoreError {
    SecretStoreError::Unavailable(e.to_string())
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<String, SecretStoreError> {
        if !self.initialized {
            return Err(SecretStoreError::Unavailable(
                "store not initialized".to_string(),
            ));
        }

        let path = self.secret_path(name)?;
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SecretStoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(unavailable(e)),
        };

        let mut value = String::new();
        file.read_to_string(&mut value).map_err(unavailable)?;
        Ok(value)
    }

    async fn create(&self, name: &str, value: &str) -> Result<CreateOutcome, SecretStoreError> {
        if !self.initialized {
            return Err(SecretStoreError::Unavailable(
                "store not initialized".to_string(),
            ));
        }

        let path = self.secret_path(name)?;
        if self.exists(&path) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        // Write to a temp file first, then rename for atomicity.
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value).map_err(unavailable)?;
        fs::rename(&temp_path, &path).map_err(unavailable)?;
        Ok(CreateOutcome::Created)
    }

    /// Write-read-delete probe against the store root.
    async fn health_check(&self) -> Result<(), SecretStoreError> {
        if !self.initialized {
            return Err(SecretStoreError::Unavailable(
                "store not initialized".to_string(),
            ));
        }

        let probe = self.root.join(".health_check");
        let data = b"health_check_data";
        fs::write(&probe, data).map_err(unavailable)?;
        let read = fs::read(&probe).map_err(unavailable)?;
        fs::remove_file(&probe).map_err(unavailable)?;
        if read != data {
            return Err(SecretStoreError::Unavailable(
                "health check data mismatch".to_string(),
            ));
        }
        Ok(())
    }
}
