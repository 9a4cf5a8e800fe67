//! # Desktop Bridge Implementations
//!
//! Default implementations of the host-side bridge traits for desktop
//! platforms (macOS, Windows, Linux):
//! - `FileSystemAccess` using `tokio::fs`
//! - `FailureReporter` that records failures through `tracing`
//! - platform cache/data directories via `dirs`
//!
//! The drive service client, mirror store, account directory and upload
//! scheduler are always injected by the host application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopDirectories, TokioFileSystem, TracingFailureReporter};
//!
//! let dirs = DesktopDirectories::for_app("drive-documents");
//! let fs = TokioFileSystem::new();
//! let reporter = TracingFailureReporter::default();
//! ```

mod directories;
mod filesystem;
mod reporter;

pub use directories::DesktopDirectories;
pub use filesystem::TokioFileSystem;
pub use reporter::TracingFailureReporter;
