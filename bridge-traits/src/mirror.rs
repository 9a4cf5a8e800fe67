//! Local Mirror Store Abstraction
//!
//! Persisted, queryable cache of remote file metadata. The store owns its own
//! transactions; the core never holds a lock across these calls.

use async_trait::async_trait;

use crate::{
    drive::{Drive, DriveScope, FilePage, FileRecord, SortOrder, SpecialFolder},
    error::Result,
};

/// Local Mirror Store
///
/// The page loaders are backed by remote pagination: the store fetches the
/// page from the drive service, persists it and returns the stored rows. When
/// the service is unreachable it answers from what it already holds.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Drives known for a user.
    async fn drives(&self, user_id: i64) -> Result<Vec<Drive>>;

    /// Look up a single record. `Ok(None)` when the id is unknown.
    async fn get_file(&self, scope: &DriveScope, file_id: i64) -> Result<Option<FileRecord>>;

    /// Load one page of a folder's children, sorted.
    async fn load_children_page(
        &self,
        scope: &DriveScope,
        folder_id: i64,
        order: SortOrder,
        cursor: Option<String>,
    ) -> Result<FilePage>;

    /// Load one page of a synthetic grouping folder.
    async fn load_special_page(
        &self,
        user_id: i64,
        folder: SpecialFolder,
        order: SortOrder,
        cursor: Option<String>,
    ) -> Result<FilePage>;

    async fn insert(&self, scope: &DriveScope, record: &FileRecord) -> Result<()>;

    async fn update(&self, scope: &DriveScope, record: &FileRecord) -> Result<()>;

    /// Remove a record, returning whether it existed.
    async fn remove(&self, scope: &DriveScope, file_id: i64) -> Result<bool>;
}
