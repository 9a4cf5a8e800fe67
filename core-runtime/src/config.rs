//! # Provider Configuration
//!
//! Builder-based configuration for the document provider.
//!
//! ## Overview
//!
//! `ProviderConfig` holds every collaborator the core calls out to plus the
//! tunables of the listing and content layers. [`ProviderConfigBuilder::build`]
//! refuses to produce a config with a missing capability so the provider
//! fails at startup rather than on the first OS request.
//!
//! ## Required Dependencies
//!
//! - `RemoteDriveClient` - drive service API
//! - `MirrorStore` - local metadata mirror
//! - `AccountDirectory` - signed-in accounts
//! - `UploadScheduler` - background upload queue
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `FileSystemAccess` - desktop default: `TokioFileSystem`
//! - `FailureReporter` - desktop default: `TracingFailureReporter`
//! - cache/offline directories - desktop default: platform cache/data dirs
//! - `Clock` - defaults to `SystemClock`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ProviderConfig;
//! use std::sync::Arc;
//!
//! let config = ProviderConfig::builder()
//!     .remote_client(Arc::new(MyDriveApi::new(token_source)))
//!     .mirror_store(Arc::new(MyMirror::open(db)?))
//!     .account_directory(Arc::new(MyAccounts))
//!     .upload_scheduler(Arc::new(MyUploads))
//!     .cache_dir("/data/cache/documents")
//!     .offline_dir("/data/files/offline")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AccountDirectory, Clock, FailureReporter, FileSystemAccess, MirrorStore, RemoteDriveClient,
    SystemClock, UploadScheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default content authority used in change-notification URIs.
pub const DEFAULT_AUTHORITY: &str = "drive.documents";

/// Default title shown for every root.
pub const DEFAULT_ROOT_TITLE: &str = "Drive";

const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_QUERY_CACHE_TTL: Duration = Duration::from_secs(30);
const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Configuration for the document provider core.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Content authority of the provider
    pub authority: String,

    /// Title of each root row
    pub root_title: String,

    /// Download cache, thumbnails and write staging live below this directory
    pub cache_dir: PathBuf,

    /// Offline copies kept by the user
    pub offline_dir: PathBuf,

    /// Bound on the "fresher remote record" lookup before opening a file
    pub metadata_timeout: Duration,

    /// How long a completed listing may be served again for the same query
    pub query_cache_ttl: Duration,

    /// Event bus capacity
    pub event_buffer_size: usize,

    /// Check SHA-256 of offline copies when the record carries one
    pub verify_offline_hashes: bool,

    pub remote_client: Arc<dyn RemoteDriveClient>,
    pub mirror_store: Arc<dyn MirrorStore>,
    pub account_directory: Arc<dyn AccountDirectory>,
    pub upload_scheduler: Arc<dyn UploadScheduler>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub failure_reporter: Arc<dyn FailureReporter>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("authority", &self.authority)
            .field("root_title", &self.root_title)
            .field("cache_dir", &self.cache_dir)
            .field("offline_dir", &self.offline_dir)
            .field("metadata_timeout", &self.metadata_timeout)
            .field("query_cache_ttl", &self.query_cache_ttl)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("verify_offline_hashes", &self.verify_offline_hashes)
            .field("remote_client", &"RemoteDriveClient { ... }")
            .field("mirror_store", &"MirrorStore { ... }")
            .field("account_directory", &"AccountDirectory { ... }")
            .field("upload_scheduler", &"UploadScheduler { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("failure_reporter", &"FailureReporter { ... }")
            .finish()
    }
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.authority.is_empty() || self.authority.contains('/') {
            return Err(Error::Config(format!(
                "Authority '{}' must be non-empty and must not contain '/'",
                self.authority
            )));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.offline_dir.as_os_str().is_empty() {
            return Err(Error::Config("Offline directory cannot be empty".to_string()));
        }

        // Cache purges must never touch offline copies.
        if self.offline_dir.starts_with(&self.cache_dir) {
            return Err(Error::Config(
                "Offline directory must not live inside the cache directory".to_string(),
            ));
        }

        if self.metadata_timeout.is_zero() || self.metadata_timeout > Duration::from_secs(60) {
            return Err(Error::Config(
                "Metadata timeout must be between 1ms and 60 seconds".to_string(),
            ));
        }

        if self.query_cache_ttl > Duration::from_secs(3600) {
            return Err(Error::Config(
                "Query cache TTL exceeds maximum of 1 hour".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing(
        "FileSystemAccess",
        "FileSystemAccess implementation is required for cache and offline files. \
         Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
         Mobile: inject an adapter for the app sandbox.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_failure_reporter() -> Result<Arc<dyn FailureReporter>> {
    Ok(Arc::new(bridge_desktop::TracingFailureReporter::default()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_failure_reporter() -> Result<Arc<dyn FailureReporter>> {
    Err(capability_missing(
        "FailureReporter",
        "FailureReporter implementation is required for write-close failures. \
         Desktop: enable the 'desktop-shims' feature to use TracingFailureReporter. \
         Mobile: inject the crash-reporting adapter.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn default_directories() -> Option<(PathBuf, PathBuf)> {
    let dirs = bridge_desktop::DesktopDirectories::for_app("drive-documents");
    Some((dirs.cache_dir, dirs.offline_dir))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_directories() -> Option<(PathBuf, PathBuf)> {
    None
}

/// Builder for constructing [`ProviderConfig`] instances.
#[derive(Default)]
pub struct ProviderConfigBuilder {
    authority: Option<String>,
    root_title: Option<String>,
    cache_dir: Option<PathBuf>,
    offline_dir: Option<PathBuf>,
    metadata_timeout: Option<Duration>,
    query_cache_ttl: Option<Duration>,
    event_buffer_size: Option<usize>,
    verify_offline_hashes: Option<bool>,
    remote_client: Option<Arc<dyn RemoteDriveClient>>,
    mirror_store: Option<Arc<dyn MirrorStore>>,
    account_directory: Option<Arc<dyn AccountDirectory>>,
    upload_scheduler: Option<Arc<dyn UploadScheduler>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    failure_reporter: Option<Arc<dyn FailureReporter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ProviderConfigBuilder {
    /// Sets the content authority.
    ///
    /// Default: `drive.documents`
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Sets the title shown on each root.
    pub fn root_title(mut self, title: impl Into<String>) -> Self {
        self.root_title = Some(title.into());
        self
    }

    /// Sets the cache directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::ProviderConfig;
    ///
    /// let builder = ProviderConfig::builder()
    ///     .cache_dir("/path/to/cache");
    /// ```
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the directory holding offline copies.
    pub fn offline_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.offline_dir = Some(path.into());
        self
    }

    /// Bounds the fresher-record lookup done before opening content.
    ///
    /// Default: 5 seconds
    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = Some(timeout);
        self
    }

    /// How long a completed listing is reused for an identical query.
    ///
    /// Default: 30 seconds. `Duration::ZERO` disables reuse of completed
    /// listings; in-flight listings are always reused.
    pub fn query_cache_ttl(mut self, ttl: Duration) -> Self {
        self.query_cache_ttl = Some(ttl);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables SHA-256 verification of offline copies.
    ///
    /// Default: true
    pub fn verify_offline_hashes(mut self, enabled: bool) -> Self {
        self.verify_offline_hashes = Some(enabled);
        self
    }

    /// Sets the Remote API Client (required).
    pub fn remote_client(mut self, client: Arc<dyn RemoteDriveClient>) -> Self {
        self.remote_client = Some(client);
        self
    }

    /// Sets the Local Mirror Store (required).
    pub fn mirror_store(mut self, store: Arc<dyn MirrorStore>) -> Self {
        self.mirror_store = Some(store);
        self
    }

    /// Sets the account directory (required).
    pub fn account_directory(mut self, directory: Arc<dyn AccountDirectory>) -> Self {
        self.account_directory = Some(directory);
        self
    }

    /// Sets the background upload scheduler (required).
    pub fn upload_scheduler(mut self, scheduler: Arc<dyn UploadScheduler>) -> Self {
        self.upload_scheduler = Some(scheduler);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, `TokioFileSystem` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the failure telemetry sink.
    pub fn failure_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.failure_reporter = Some(reporter);
        self
    }

    /// Sets the clock used to stamp staged writes.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `ProviderConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when a required collaborator was not set and has
    ///   no platform default
    /// - `Config` when a directory is missing or a value is out of range
    pub fn build(self) -> Result<ProviderConfig> {
        let remote_client = self.remote_client.ok_or_else(|| {
            capability_missing(
                "RemoteDriveClient",
                "Inject the drive service client with .remote_client().",
            )
        })?;

        let mirror_store = self.mirror_store.ok_or_else(|| {
            capability_missing(
                "MirrorStore",
                "Inject the local metadata mirror with .mirror_store().",
            )
        })?;

        let account_directory = self.account_directory.ok_or_else(|| {
            capability_missing(
                "AccountDirectory",
                "Inject the account directory with .account_directory().",
            )
        })?;

        let upload_scheduler = self.upload_scheduler.ok_or_else(|| {
            capability_missing(
                "UploadScheduler",
                "Inject the background upload queue with .upload_scheduler().",
            )
        })?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => default_file_system()?,
        };

        let failure_reporter = match self.failure_reporter {
            Some(reporter) => reporter,
            None => default_failure_reporter()?,
        };

        let defaults = default_directories();

        let cache_dir = self
            .cache_dir
            .or_else(|| defaults.as_ref().map(|(cache, _)| cache.clone()))
            .ok_or_else(|| {
                Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
            })?;

        let offline_dir = self
            .offline_dir
            .or_else(|| defaults.map(|(_, offline)| offline))
            .ok_or_else(|| {
                Error::Config(
                    "Offline directory is required. Use .offline_dir() to set it.".to_string(),
                )
            })?;

        let config = ProviderConfig {
            authority: self
                .authority
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            root_title: self
                .root_title
                .unwrap_or_else(|| DEFAULT_ROOT_TITLE.to_string()),
            cache_dir,
            offline_dir,
            metadata_timeout: self.metadata_timeout.unwrap_or(DEFAULT_METADATA_TIMEOUT),
            query_cache_ttl: self.query_cache_ttl.unwrap_or(DEFAULT_QUERY_CACHE_TTL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            verify_offline_hashes: self.verify_offline_hashes.unwrap_or(true),
            remote_client,
            mirror_store,
            account_directory,
            upload_scheduler,
            file_system,
            failure_reporter,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
