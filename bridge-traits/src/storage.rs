//! File System Access Abstraction
//!
//! Async file operations needed by the sync engine: writing downloaded
//! assets, enumerating the local store, and deleting orphans.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Async file system access trait
///
/// Implementations must make `list_files` return regular files only,
/// recursively, never directories or other entry kinds. The reconciler
/// relies on that guarantee when computing the orphan set.
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check whether a path exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all missing parents
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read an entire file into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write a file, creating parent directories and overwriting any
    /// existing file at that path
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a single file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List every regular file under `root`, recursively.
    ///
    /// Returns an empty list when `root` does not exist.
    async fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>>;
}
