//! Remote API Client Abstraction
//!
//! The drive service's HTTP API as seen by the core. Transport, auth and
//! encoding belong to the implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    drive::{DriveScope, FilePage, FileRecord},
    error::Result,
    storage::DynAsyncRead,
};

/// Remote API Client
///
/// Every call is scoped with a [`DriveScope`]. Non-success responses map to
/// [`BridgeError::Remote`](crate::error::BridgeError::Remote), connectivity
/// problems to [`BridgeError::Network`](crate::error::BridgeError::Network).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::{DriveScope, RemoteDriveClient};
///
/// async fn rename(client: &dyn RemoteDriveClient) -> Result<()> {
///     let scope = DriveScope::new(7, 42);
///     let record = client.rename(&scope, 1337, "report-final.pdf").await?;
///     assert_eq!(record.name, "report-final.pdf");
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RemoteDriveClient: Send + Sync {
    /// Refresh the user's drive list and persist it on the client side.
    async fn refresh_drive_metadata(&self, user_id: i64) -> Result<()>;

    /// Search a drive by name.
    async fn search(
        &self,
        scope: &DriveScope,
        query: &str,
        cursor: Option<String>,
    ) -> Result<FilePage>;

    /// Fetch the current metadata of a single file.
    async fn get_file(&self, scope: &DriveScope, file_id: i64) -> Result<FileRecord>;

    /// Stream the file content.
    async fn download(&self, scope: &DriveScope, file_id: i64) -> Result<Box<DynAsyncRead>>;

    /// Fetch the thumbnail image bytes.
    async fn thumbnail(&self, scope: &DriveScope, file_id: i64) -> Result<Bytes>;

    async fn create_folder(
        &self,
        scope: &DriveScope,
        parent_id: i64,
        name: &str,
    ) -> Result<FileRecord>;

    /// Create a zero-byte placeholder file.
    async fn create_file(&self, scope: &DriveScope, parent_id: i64, name: &str)
        -> Result<FileRecord>;

    async fn rename(&self, scope: &DriveScope, file_id: i64, new_name: &str) -> Result<FileRecord>;

    /// Copy a file into another folder of the same drive, returning the copy.
    async fn copy(
        &self,
        scope: &DriveScope,
        file_id: i64,
        target_parent_id: i64,
    ) -> Result<FileRecord>;

    /// Move a file into another folder of the same drive.
    async fn move_file(
        &self,
        scope: &DriveScope,
        file_id: i64,
        target_parent_id: i64,
    ) -> Result<FileRecord>;

    async fn delete(&self, scope: &DriveScope, file_id: i64) -> Result<()>;
}
