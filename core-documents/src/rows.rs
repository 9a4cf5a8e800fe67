//! Rows returned to the host.

use bitflags::bitflags;
use bridge_traits::{Drive, FileRecord, SpecialFolder, UserAccount};
use serde::{Deserialize, Serialize};

use crate::identity::DocumentId;

/// Mime type of every directory row.
pub const DIRECTORY_MIME_TYPE: &str = "vnd.android.document/directory";

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Icon resource name for root rows.
pub const ROOT_ICON: &str = "ic_drive_root";

bitflags! {
    /// Per-document capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DocumentFlags: u32 {
        const SUPPORTS_THUMBNAIL = 1 << 0;
        const SUPPORTS_WRITE = 1 << 1;
        const SUPPORTS_DELETE = 1 << 2;
        const DIR_SUPPORTS_CREATE = 1 << 3;
        const SUPPORTS_RENAME = 1 << 6;
        const SUPPORTS_COPY = 1 << 7;
        const SUPPORTS_MOVE = 1 << 8;
    }
}

bitflags! {
    /// Per-root capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RootFlags: u32 {
        const SUPPORTS_CREATE = 1 << 0;
        const SUPPORTS_SEARCH = 1 << 3;
        const SUPPORTS_IS_CHILD = 1 << 4;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootRow {
    pub root_id: String,
    pub document_id: DocumentId,
    pub title: String,
    pub summary: Option<String>,
    pub flags: RootFlags,
    pub icon: String,
}

impl RootRow {
    pub fn for_user(user: &UserAccount, title: &str) -> Self {
        Self {
            root_id: user.id.to_string(),
            document_id: DocumentId::root(user.id),
            title: title.to_string(),
            summary: Some(user.email.clone()).filter(|email| !email.is_empty()),
            flags: RootFlags::SUPPORTS_CREATE
                | RootFlags::SUPPORTS_SEARCH
                | RootFlags::SUPPORTS_IS_CHILD,
            icon: ROOT_ICON.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub document_id: DocumentId,
    pub mime_type: String,
    pub display_name: String,
    /// Unix milliseconds, `None` for synthetic rows
    pub last_modified: Option<i64>,
    /// Bytes, `None` for directories
    pub size: Option<u64>,
    pub flags: DocumentFlags,
}

impl DocumentRow {
    pub fn is_directory(&self) -> bool {
        self.mime_type == DIRECTORY_MIME_TYPE
    }

    /// The synthetic root of a user.
    ///
    /// `DIR_SUPPORTS_CREATE` lets the host offer the root as a destination;
    /// the new document itself is created in one of the drives below it.
    pub fn root(user: &UserAccount) -> Self {
        Self {
            document_id: DocumentId::root(user.id),
            mime_type: DIRECTORY_MIME_TYPE.to_string(),
            display_name: user.display_name.clone(),
            last_modified: None,
            size: None,
            flags: DocumentFlags::DIR_SUPPORTS_CREATE,
        }
    }

    /// A grouping folder. Exposes no capabilities.
    pub fn synthetic(user_id: i64, folder: SpecialFolder) -> Self {
        Self {
            document_id: DocumentId::synthetic(user_id, folder),
            mime_type: DIRECTORY_MIME_TYPE.to_string(),
            display_name: special_folder_name(folder).to_string(),
            last_modified: None,
            size: None,
            flags: DocumentFlags::empty(),
        }
    }

    /// The root folder of a drive, as listed below the user's root.
    pub fn drive(document_id: DocumentId, drive: &Drive) -> Self {
        let flags = if drive.can_create {
            DocumentFlags::DIR_SUPPORTS_CREATE
        } else {
            DocumentFlags::empty()
        };
        Self {
            document_id,
            mime_type: DIRECTORY_MIME_TYPE.to_string(),
            display_name: drive.name.clone(),
            last_modified: None,
            size: None,
            flags,
        }
    }

    /// A drive's root folder known only from its mirrored record. Drive roots
    /// are never renamed, moved or deleted.
    pub fn drive_folder(document_id: DocumentId, record: &FileRecord) -> Self {
        let flags = if record.can_create {
            DocumentFlags::DIR_SUPPORTS_CREATE
        } else {
            DocumentFlags::empty()
        };
        Self {
            document_id,
            mime_type: DIRECTORY_MIME_TYPE.to_string(),
            display_name: record.name.clone(),
            last_modified: Some(record.last_modified.saturating_mul(1000)),
            size: None,
            flags,
        }
    }

    pub fn file(document_id: DocumentId, record: &FileRecord) -> Self {
        let mut flags = DocumentFlags::SUPPORTS_DELETE
            | DocumentFlags::SUPPORTS_RENAME
            | DocumentFlags::SUPPORTS_COPY
            | DocumentFlags::SUPPORTS_MOVE;

        if record.is_folder {
            if record.can_create {
                flags |= DocumentFlags::DIR_SUPPORTS_CREATE;
            }
        } else {
            flags |= DocumentFlags::SUPPORTS_WRITE;
            if record.has_thumbnail {
                flags |= DocumentFlags::SUPPORTS_THUMBNAIL;
            }
        }

        Self {
            document_id,
            mime_type: mime_type_for(record),
            display_name: record.name.clone(),
            last_modified: Some(record.last_modified.saturating_mul(1000)),
            size: (!record.is_folder).then_some(record.size),
            flags,
        }
    }
}

pub fn special_folder_name(folder: SpecialFolder) -> &'static str {
    match folder {
        SpecialFolder::MyShares => "My shares",
        SpecialFolder::SharedWithMe => "Shared with me",
    }
}

pub fn mime_type_for(record: &FileRecord) -> String {
    if record.is_folder {
        DIRECTORY_MIME_TYPE.to_string()
    } else {
        mime_type_for_name(&record.name)
    }
}

pub fn mime_type_for_name(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string()
}
