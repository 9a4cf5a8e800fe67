//! Workspace umbrella crate.
//!
//! Host applications depend on `drive-documents` and pick the platform
//! adapters through features instead of wiring each workspace crate:
//!
//! - `desktop-shims` (default): `TokioFileSystem`, `TracingFailureReporter`
//!   and platform cache directories as `ProviderConfig` defaults.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
