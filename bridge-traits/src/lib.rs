//! # Host Bridge Traits
//!
//! Contracts between the document-provider core and the collaborators it
//! does not own.
//!
//! ## Traits
//!
//! ### Drive service
//! - [`RemoteDriveClient`](remote::RemoteDriveClient) - Remote API Client for the cloud drive
//! - [`MirrorStore`](mirror::MirrorStore) - Local Mirror Store of file metadata
//!
//! ### Host integration
//! - [`AccountDirectory`](host::AccountDirectory) - Signed-in accounts
//! - [`UploadScheduler`](host::UploadScheduler) - Background upload queue
//! - [`FailureReporter`](host::FailureReporter) - Failure telemetry
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Cache, offline and staging file I/O
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start when a required collaborator is missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let remote = builder.remote_client.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "RemoteDriveClient".to_string(),
//!     message: "Inject the drive service client before building the provider.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All traits return [`BridgeError`](error::BridgeError). Implementations
//! should keep the remote/network distinction intact: the core falls back to
//! cached artifacts on [`BridgeError::Network`] and surfaces
//! [`BridgeError::Remote`] to the caller.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; the core shares them across tasks behind `Arc`.

pub mod drive;
pub mod error;
pub mod host;
pub mod mirror;
pub mod remote;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use drive::{
    Drive, DriveScope, FilePage, FileRecord, SortOrder, SpecialFolder, DRIVE_ROOT_FOLDER_ID,
};
pub use host::{AccountDirectory, FailureReporter, UploadRequest, UploadScheduler, UserAccount};
pub use mirror::MirrorStore;
pub use remote::RemoteDriveClient;
pub use storage::{DynAsyncRead, DynAsyncWrite, FileMetadata, FileSystemAccess};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
