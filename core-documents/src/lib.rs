//! # Core Documents
//!
//! Exposes a remote, paginated, multi-user drive tree as a hierarchical
//! document provider.
//!
//! ## Components
//!
//! - [`identity`] - Encode and decode opaque document ids
//! - [`cursor`] - Cancellable background population of listings
//! - [`session`] - Current session, duplicate-query reuse and result tables
//! - [`roots`] - Root enumeration and drive-scoped search
//! - [`query`] - Single-document lookups
//! - [`content`] - Offline, cache and download tiers for file bytes; staged writes
//! - [`thumbnail`] - Thumbnails with cached fallback
//! - [`mutation`] - Create, rename, copy, move and delete
//!
//! All components talk to the drive service through
//! [`RemoteDriveClient`](bridge_traits::RemoteDriveClient) and to the local
//! metadata mirror through [`MirrorStore`](bridge_traits::MirrorStore).

pub mod content;
pub mod cursor;
pub mod error;
pub mod identity;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod roots;
pub mod rows;
pub mod session;
pub mod sort;
pub mod thumbnail;

pub use content::{ContentResolver, OpenMode, OpenedDocument, WriteSession};
pub use cursor::{CursorEngine, ListingSource};
pub use error::{DocumentsError, Result};
pub use identity::{ConcreteRef, DocumentId, DocumentRef};
pub use mutation::MutationGateway;
pub use notify::Notifier;
pub use query::DocumentLookup;
pub use roots::RootEnumerator;
pub use rows::{DocumentFlags, DocumentRow, RootFlags, RootRow, DIRECTORY_MIME_TYPE};
pub use session::{QueryKey, ResultTable, SessionRegistry};
pub use sort::parse_sort_order;
