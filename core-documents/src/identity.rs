//! # Identity Codec
//!
//! Encodes and decodes the opaque document ids handed to the host.
//!
//! ## Grammar
//!
//! ```text
//! <userId>/[<sentinelFolderId>/]<driveName>@<driveId>/<fileId>[/<fileId>...]
//! ```
//!
//! - `7` is the synthetic root of user 7
//! - `7/-1` and `7/-2` are the "my shares" and "shared with me" groupings
//! - `7/Work@42/1` is the root folder of drive 42
//! - `7/-2/Team@5/33` is file 33 reached through "shared with me"; every call
//!   for it targets the shared scope of drive 5
//!
//! The string form only exists at the host boundary. Everything inside the
//! core works on [`DocumentRef`].

use bridge_traits::{DriveScope, SpecialFolder, DRIVE_ROOT_FOLDER_ID};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DocumentsError, Result};

/// Sentinel folder id of the "my shares" grouping.
pub const MY_SHARES_FOLDER_ID: i64 = -1;

/// Sentinel folder id of the "shared with me" grouping.
pub const SHARED_WITH_ME_FOLDER_ID: i64 = -2;

/// Drive id reported for ids that have no drive segment yet.
pub const INVALID_DRIVE_ID: i64 = -1;

const SEPARATOR: char = '/';
const DRIVE_SEPARATOR: char = '@';

/// Opaque, path-like document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Id of a user's synthetic root.
    pub fn root(user_id: i64) -> Self {
        Self(user_id.to_string())
    }

    /// Id of a synthetic grouping folder below a user's root.
    pub fn synthetic(user_id: i64, folder: SpecialFolder) -> Self {
        Self(format!("{}{}{}", user_id, SEPARATOR, sentinel_id(folder)))
    }

    /// Append a child to `parent`.
    ///
    /// `extra_segment` is the drive segment (see [`drive_segment`]) and is
    /// required when `parent` is a root or grouping folder, whose children
    /// live in arbitrary drives.
    pub fn encode(parent: &DocumentId, child_file_id: i64, extra_segment: Option<&str>) -> Self {
        let mut id = String::with_capacity(parent.0.len() + 24);
        id.push_str(&parent.0);
        if let Some(segment) = extra_segment {
            id.push(SEPARATOR);
            id.push_str(segment);
        }
        id.push(SEPARATOR);
        id.push_str(&child_file_id.to_string());
        Self(id)
    }

    /// Child inside the same drive.
    pub fn child(&self, file_id: i64) -> Self {
        Self::encode(self, file_id, None)
    }

    /// Child that enters a drive, e.g. a drive below the root.
    pub fn drive_child(&self, drive_name: &str, drive_id: i64, file_id: i64) -> Self {
        Self::encode(self, file_id, Some(&drive_segment(drive_name, drive_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode into a typed reference.
    pub fn parse(&self) -> Result<DocumentRef> {
        let invalid = || DocumentsError::InvalidDocumentId(self.0.clone());

        let segments: Vec<&str> = self.0.split(SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        let user_id: i64 = segments[0].parse().map_err(|_| invalid())?;
        let mut rest = &segments[1..];

        let Some(first) = rest.first() else {
            return Ok(DocumentRef::Root { user_id });
        };

        let via = match first.parse::<i64>() {
            Ok(MY_SHARES_FOLDER_ID) => Some(SpecialFolder::MyShares),
            Ok(SHARED_WITH_ME_FOLDER_ID) => Some(SpecialFolder::SharedWithMe),
            Ok(_) => return Err(invalid()),
            Err(_) => None,
        };
        if let Some(folder) = via {
            rest = &rest[1..];
            if rest.is_empty() {
                return Ok(DocumentRef::Synthetic { user_id, folder });
            }
        }

        let (drive_name, drive_id) = rest[0]
            .rsplit_once(DRIVE_SEPARATOR)
            .ok_or_else(invalid)?;
        let drive_id: i64 = drive_id.parse().map_err(|_| invalid())?;

        let files = &rest[1..];
        let mut file_id = None;
        for segment in files {
            let id: i64 = segment.parse().map_err(|_| invalid())?;
            if id < 0 {
                return Err(invalid());
            }
            file_id = Some(id);
        }
        let file_id = file_id.ok_or_else(invalid)?;

        Ok(DocumentRef::Concrete(ConcreteRef {
            user_id,
            via,
            drive_name: drive_name.to_string(),
            drive_id,
            file_id,
        }))
    }

    /// The id of the containing folder, `None` for a root.
    pub fn parent(&self) -> Option<DocumentId> {
        let (mut head, _) = self.0.rsplit_once(SEPARATOR)?;
        // A drive segment is never a folder of its own.
        if let Some((before, last)) = head.rsplit_once(SEPARATOR) {
            if last.contains(DRIVE_SEPARATOR) {
                head = before;
            }
        }
        Some(Self(head.to_string()))
    }

    /// Segment-aligned descendant check.
    pub fn is_child_of(&self, ancestor: &DocumentId) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == SEPARATOR as u8
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for DocumentId {
    type Err = DocumentsError;

    /// Parses and validates a host-supplied id.
    fn from_str(s: &str) -> Result<Self> {
        let id = Self(s.to_string());
        id.parse()?;
        Ok(id)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `<name>@<id>`, with `/` in the name replaced so the path stays intact.
pub fn drive_segment(drive_name: &str, drive_id: i64) -> String {
    format!(
        "{}{}{}",
        drive_name.replace(SEPARATOR, "_"),
        DRIVE_SEPARATOR,
        drive_id
    )
}

fn sentinel_id(folder: SpecialFolder) -> i64 {
    match folder {
        SpecialFolder::MyShares => MY_SHARES_FOLDER_ID,
        SpecialFolder::SharedWithMe => SHARED_WITH_ME_FOLDER_ID,
    }
}

/// Decoded document identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRef {
    /// A user's root
    Root { user_id: i64 },
    /// A grouping folder with no remote counterpart
    Synthetic { user_id: i64, folder: SpecialFolder },
    /// A real file or folder inside a drive
    Concrete(ConcreteRef),
}

impl DocumentRef {
    pub fn user_id(&self) -> i64 {
        match self {
            DocumentRef::Root { user_id } | DocumentRef::Synthetic { user_id, .. } => *user_id,
            DocumentRef::Concrete(c) => c.user_id,
        }
    }

    /// [`INVALID_DRIVE_ID`] unless the id carries a drive segment.
    pub fn drive_id(&self) -> i64 {
        self.concrete().map_or(INVALID_DRIVE_ID, |c| c.drive_id)
    }

    pub fn scope(&self) -> Option<DriveScope> {
        self.concrete().map(ConcreteRef::scope)
    }

    pub fn concrete(&self) -> Option<&ConcreteRef> {
        match self {
            DocumentRef::Concrete(c) => Some(c),
            _ => None,
        }
    }
}

/// A file or folder inside a drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteRef {
    pub user_id: i64,
    /// Grouping folder the path went through, if any
    pub via: Option<SpecialFolder>,
    pub drive_name: String,
    pub drive_id: i64,
    pub file_id: i64,
}

impl ConcreteRef {
    pub fn shared_with_me(&self) -> bool {
        self.via == Some(SpecialFolder::SharedWithMe)
    }

    pub fn scope(&self) -> DriveScope {
        if self.shared_with_me() {
            DriveScope::shared(self.user_id, self.drive_id)
        } else {
            DriveScope::new(self.user_id, self.drive_id)
        }
    }

    pub fn is_drive_root(&self) -> bool {
        self.file_id == DRIVE_ROOT_FOLDER_ID
    }
}
