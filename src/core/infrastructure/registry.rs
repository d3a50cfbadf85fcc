//! Resolution of logical image and data-volume names to filesystem paths.

use crate::core::domain::error::ResolveError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolves image names to bootable kernel images.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// # Errors
    /// `ResolveError::UnknownImage` if no image carries `name`.
    async fn image_path(&self, name: &str) -> Result<PathBuf, ResolveError>;
}

/// Resolves data-volume names to disk images.
#[async_trait]
pub trait DataVolumeRegistry: Send + Sync {
    /// # Errors
    /// `ResolveError::UnknownVolume` if no volume carries `name`.
    async fn volume_path(&self, name: &str) -> Result<PathBuf, ResolveError>;
}

/// A fixed name → path table.
///
/// Implements both registry traits, so one table can serve images and
/// another volumes.
///
/// # Examples
///
/// ```
/// use cunik::StaticRegistry;
///
/// let images = StaticRegistry::new().with_entry("alpine", "/images/alpine.img");
/// assert_eq!(images.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: HashMap<String, PathBuf>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    pub fn with_entry(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(name.into(), path.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ImageRegistry for StaticRegistry {
    async fn image_path(&self, name: &str) -> Result<PathBuf, ResolveError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownImage(name.to_string()))
    }
}

#[async_trait]
impl DataVolumeRegistry for StaticRegistry {
    async fn volume_path(&self, name: &str) -> Result<PathBuf, ResolveError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownVolume(name.to_string()))
    }
}

/// Resolves `name` to `<root>/<name>` when that file exists.
///
/// Names containing path separators or `..` never resolve.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn lookup(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return None;
        }
        let candidate = self.root.join(name);
        match tokio::fs::metadata(&candidate).await {
            Ok(metadata) if metadata.is_file() => Some(candidate),
            _ => None,
        }
    }
}

#[async_trait]
impl ImageRegistry for DirectoryRegistry {
    async fn image_path(&self, name: &str) -> Result<PathBuf, ResolveError> {
        self.lookup(name)
            .await
            .ok_or_else(|| ResolveError::UnknownImage(name.to_string()))
    }
}

#[async_trait]
impl DataVolumeRegistry for DirectoryRegistry {
    async fn volume_path(&self, name: &str) -> Result<PathBuf, ResolveError> {
        self.lookup(name)
            .await
            .ok_or_else(|| ResolveError::UnknownVolume(name.to_string()))
    }
}
