//! Content store access for local image assets.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default URI prefix under which the built-in renderer exposes store assets.
pub const DEFAULT_RESOURCE_PREFIX: &str = "app://local/";

/// Errors from reading store content.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{0}' not found in content store")]
    NotFound(String),

    #[error("'{0}' resolves outside the content store")]
    OutsideRoot(String),

    #[error("failed to read '{path}': {source}")]
    Io { path: String, source: io::Error },
}

/// Read access to the document's storage root.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// URI prefix that marks a reference as belonging to this store.
    fn resource_prefix(&self) -> &str;

    /// Read the bytes at `relative_path` (already percent-decoded).
    async fn read_binary(&self, relative_path: &str) -> Result<Vec<u8>, StoreError>;
}

/// A store backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
    prefix: String,
}

impl VaultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root, DEFAULT_RESOURCE_PREFIX)
    }

    pub fn with_prefix(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    fn resolve(&self, relative_path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(relative_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StoreError::OutsideRoot(relative_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for VaultStore {
    fn resource_prefix(&self) -> &str {
        &self.prefix
    }

    async fn read_binary(&self, relative_path: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(relative_path)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(relative_path.to_string()),
            _ => StoreError::Io {
                path: relative_path.to_string(),
                source: e,
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
