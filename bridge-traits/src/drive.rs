//! Drive Model Types
//!
//! Plain data shared between the Remote API Client, the Local Mirror Store and
//! the core. Identifiers are the drive service's numeric ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the root folder inside every drive.
pub const DRIVE_ROOT_FOLDER_ID: i64 = 1;

/// Scope that every remote and mirror call targets.
///
/// Files reached through the "shared with me" grouping live in a separate
/// scope even when the drive id is the same as one the user owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriveScope {
    pub user_id: i64,
    pub drive_id: i64,
    pub shared_with_me: bool,
}

impl DriveScope {
    pub fn new(user_id: i64, drive_id: i64) -> Self {
        Self {
            user_id,
            drive_id,
            shared_with_me: false,
        }
    }

    pub fn shared(user_id: i64, drive_id: i64) -> Self {
        Self {
            user_id,
            drive_id,
            shared_with_me: true,
        }
    }
}

impl fmt::Display for DriveScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shared_with_me {
            write!(f, "{}:{}(shared)", self.user_id, self.drive_id)
        } else {
            write!(f, "{}:{}", self.user_id, self.drive_id)
        }
    }
}

/// A drive the user can access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    /// Whether the user may create content at the drive root.
    pub can_create: bool,
}

/// Remote file metadata as persisted by the mirror store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub parent_id: i64,
    pub drive_id: i64,
    pub name: String,
    pub size: u64,
    /// Last modification on the server, unix seconds.
    pub last_modified: i64,
    pub is_folder: bool,
    pub has_thumbnail: bool,
    /// Creation right inside this folder.
    pub can_create: bool,
    /// Whether the user keeps an offline copy of this file.
    pub is_offline: bool,
    /// Hex SHA-256 of the content when the service provides one.
    pub sha256: Option<String>,
}

impl FileRecord {
    pub fn folder(id: i64, parent_id: i64, drive_id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            drive_id,
            name: name.into(),
            size: 0,
            last_modified: 0,
            is_folder: true,
            has_thumbnail: false,
            can_create: true,
            is_offline: false,
            sha256: None,
        }
    }

    pub fn file(
        id: i64,
        parent_id: i64,
        drive_id: i64,
        name: impl Into<String>,
        size: u64,
        last_modified: i64,
    ) -> Self {
        Self {
            id,
            parent_id,
            drive_id,
            name: name.into(),
            size,
            last_modified,
            is_folder: false,
            has_thumbnail: false,
            can_create: false,
            is_offline: false,
            sha256: None,
        }
    }
}

/// Synthetic grouping folders without a remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialFolder {
    MyShares,
    SharedWithMe,
}

/// Ordering applied to folder listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    ModifiedAsc,
    ModifiedDesc,
    SizeAsc,
    SizeDesc,
}

/// One page of files plus the cursor for the next page, if any.
pub type FilePage = (Vec<FileRecord>, Option<String>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        assert_eq!(DriveScope::new(7, 42).to_string(), "7:42");
        assert_eq!(DriveScope::shared(7, 42).to_string(), "7:42(shared)");
    }

    #[test]
    fn test_default_sort_order() {
        assert_eq!(SortOrder::default(), SortOrder::NameAsc);
    }

    #[test]
    fn test_file_record_serialization() {
        let record = FileRecord::file(12, 1, 42, "notes.txt", 128, 1_700_000_000);
        let json = serde_json::to_string(&record).unwrap();
        let back: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
