//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DynAsyncRead, DynAsyncWrite, FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Paths are used as given; the content resolver decides the layout under
/// its cache and offline roots.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(Self::map_io_error)?;
            }
        }
        Ok(())
    }
}

fn unix_secs(time: std::io::Result<SystemTime>) -> Option<i64> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: unix_secs(metadata.modified()),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.ensure_parent(path).await?;
        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.ensure_parent(to).await?;
        fs::rename(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn set_modified_time(&self, path: &Path, unix_secs: i64) -> Result<()> {
        let target = path.to_path_buf();
        let mtime = UNIX_EPOCH + Duration::from_secs(unix_secs.max(0) as u64);

        core_async::task::spawn_blocking(move || {
            std::fs::OpenOptions::new()
                .write(true)
                .open(&target)?
                .set_modified(mtime)
        })
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("set_modified_time task: {e}")))?
        .map_err(Self::map_io_error)?;

        debug!(path = ?path, unix_secs, "Set modification time");
        Ok(())
    }

    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>> {
        let file = fs::File::open(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for reading");
        Ok(Box::new(file))
    }

    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>> {
        self.ensure_parent(path).await?;
        let file = fs::File::create(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for writing");
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let test_file = dir.path().join("nested").join("test-file.txt");

        let data = Bytes::from("Hello, World!");
        fs.write_file(&test_file, data.clone()).await.unwrap();

        assert!(fs.exists(&test_file).await.unwrap());
        assert_eq!(fs.read_file(&test_file).await.unwrap(), data);

        fs.delete_file(&test_file).await.unwrap();
        assert!(!fs.exists(&test_file).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_modified_time() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("cached.bin");
        fs.write_file(&path, Bytes::from_static(b"abc")).await.unwrap();

        fs.set_modified_time(&path, 1_600_000_000).await.unwrap();

        let metadata = fs.metadata(&path).await.unwrap();
        assert_eq!(metadata.modified_at, Some(1_600_000_000));
        assert_eq!(metadata.size, 3);
    }

    #[tokio::test]
    async fn test_rename_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let part = dir.path().join("file.part");
        let target = dir.path().join("cache").join("file");

        fs.write_file(&target, Bytes::from_static(b"old")).await.unwrap();
        fs.write_file(&part, Bytes::from_static(b"new")).await.unwrap();
        fs.rename(&part, &target).await.unwrap();

        assert!(!fs.exists(&part).await.unwrap());
        assert_eq!(fs.read_file(&target).await.unwrap(), Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_streams() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("staging").join("doc.txt");

        let mut writer = fs.open_write_stream(&path).await.unwrap();
        writer.write_all(b"streamed").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut reader = fs.open_read_stream(&path).await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "streamed");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("gone.txt");

        assert!(!fs.remove_if_exists(&path).await.unwrap());
        fs.write_file(&path, Bytes::from_static(b"x")).await.unwrap();
        assert!(fs.remove_if_exists(&path).await.unwrap());
    }
}
