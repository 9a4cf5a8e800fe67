//! Storage and File System Abstractions
//!
//! File I/O used by the content resolver for offline copies, the download
//! cache, thumbnails and write staging.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// Boxed async reader handed across the bridge.
pub type DynAsyncRead = dyn core_async::io::AsyncRead + Send + Unpin;

/// Boxed async writer handed across the bridge.
pub type DynAsyncWrite = dyn core_async::io::AsyncWrite + Send + Unpin;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    /// Unix seconds
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O so hosts with sandboxed storage can provide their own
/// implementation. Desktop uses `bridge_desktop::TokioFileSystem`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn stamp(fs: &dyn FileSystemAccess, path: &Path, remote_mtime: i64) -> Result<()> {
///     fs.set_modified_time(path, remote_mtime).await?;
///     assert_eq!(fs.metadata(path).await?.modified_at, Some(remote_mtime));
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it and its parents if needed
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Atomically replace `to` with `from`
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Set the modification time (unix seconds)
    async fn set_modified_time(&self, path: &Path, unix_secs: i64) -> Result<()>;

    /// Open a file for streaming reads
    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>>;

    /// Open a file for streaming writes, truncating it
    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>>;

    /// Delete a file if present, returning whether something was removed
    async fn remove_if_exists(&self, path: &Path) -> Result<bool> {
        if self.exists(path).await? {
            self.delete_file(path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
