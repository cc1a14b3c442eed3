//! File-backed token persistence
//!
//! One JSON object at a fixed per-user path. Writes go to a temp file in the
//! same directory and are renamed over the target, so a reader never sees a
//! partial record. Last writer wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use super::traits::TokenStoreTrait;
use super::types::TokenRecord;

/// Errors raised while writing or removing the token file
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("token store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Token store rooted at a single JSON file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp `record` with `now` and replace the file atomically.
    ///
    /// # Errors
    /// Returns `TokenStoreError` if the directory, temp file, permission
    /// change or rename fails.
    pub fn save_at(
        &self,
        mut record: TokenRecord,
        now: i64,
    ) -> Result<TokenRecord, TokenStoreError> {
        record.stamp(now);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &record)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| TokenStoreError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            expires_at = ?record.expires_at,
            has_refresh_token = record.refresh_token.is_some(),
            "token_store.saved"
        );
        Ok(record)
    }

    /// Read the record, treating a missing or malformed file as absent.
    #[must_use]
    pub fn load_sync(&self) -> Option<TokenRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token_store.unreadable");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token_store.malformed");
                None
            }
        }
    }

    /// Remove the file if present.
    ///
    /// # Errors
    /// Returns `TokenStoreError::Io` for failures other than "not found".
    pub fn clear_sync(&self) -> Result<bool, TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "token_store.cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// File I/O runs on the blocking pool; `save_at` ends with an `fsync`.
#[async_trait]
impl TokenStoreTrait for FileTokenStore {
    async fn save(&self, record: TokenRecord) -> Result<TokenRecord, TokenStoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.save_at(record, Utc::now().timestamp())).await?
    }

    async fn load(&self) -> Option<TokenRecord> {
        let store = self.clone();
        match tokio::task::spawn_blocking(move || store.load_sync()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token_store.load_task_failed");
                None
            }
        }
    }

    async fn clear(&self) -> Result<bool, TokenStoreError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.clear_sync()).await?
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
