//! # Content Resolver
//!
//! Tiered access to file bytes.
//!
//! ## Read path
//!
//! 1. An intact offline copy is served without touching the network
//! 2. Otherwise a fresher record is fetched from the drive service, bounded by
//!    the metadata timeout, falling back to the mirror record
//! 3. A cached copy whose size and modified time match the record is served
//! 4. Otherwise the file is downloaded into the cache and stamped with the
//!    remote modified time
//!
//! A connectivity failure during step 4 serves the stale cached copy when
//! there is one.
//!
//! ## Write path
//!
//! Writes land in a staging file below the parent folder's staging directory.
//! Only an error-free close queues the upload and drops the cached copy.
//!
//! ## Layout
//!
//! ```text
//! <cache_dir>/content/<user>/<drive>/<file_id>
//! <cache_dir>/thumbnails/<user>/<drive>/<file_id>
//! <cache_dir>/staging/<user>/<drive>/<parent_id>/<name>
//! <offline_dir>/<user>/<drive>/<file_id>
//! ```
//!
//! Shared-with-me drives use `shared-<drive>` as the drive directory.

use bridge_traits::{
    error::Result as BridgeResult, Clock, DriveScope, DynAsyncRead, DynAsyncWrite,
    FailureReporter, FileRecord, FileSystemAccess, MirrorStore, RemoteDriveClient, UploadRequest,
    UploadScheduler,
};
use bytes::Bytes;
use core_async::io::{self, AsyncWrite, AsyncWriteExt};
use core_async::sync::Mutex;
use core_async::time::{timeout, Duration};
use core_runtime::config::ProviderConfig;
use core_runtime::events::{CoreEvent, HostEvent, TransferEvent};
use core_runtime::logging::strip_path;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, info, instrument, warn};

use crate::error::{DocumentsError, Result};
use crate::identity::{ConcreteRef, DocumentId};
use crate::notify::Notifier;
use crate::session::SessionRegistry;

const CONTENT_DIR: &str = "content";
const THUMBNAIL_DIR: &str = "thumbnails";
const STAGING_DIR: &str = "staging";
const PART_EXTENSION: &str = "part";

/// Host open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `r`
    Read,
    /// `w`
    Write,
    /// `wt`
    WriteTruncate,
    /// `rw`
    ReadWrite,
    /// `wa`
    Append,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write),
            "wt" => Ok(OpenMode::WriteTruncate),
            "rw" => Ok(OpenMode::ReadWrite),
            "wa" => Ok(OpenMode::Append),
            other => Err(DocumentsError::InvalidMode(other.to_string())),
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    /// Modes whose staging file starts from the current content.
    pub fn keeps_content(&self) -> bool {
        matches!(self, OpenMode::ReadWrite | OpenMode::Append)
    }
}

impl FromStr for OpenMode {
    type Err = DocumentsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Directory of a drive below any of the cache roots.
pub fn scope_dir(scope: &DriveScope) -> PathBuf {
    let drive = if scope.shared_with_me {
        format!("shared-{}", scope.drive_id)
    } else {
        scope.drive_id.to_string()
    };
    PathBuf::from(scope.user_id.to_string()).join(drive)
}

#[derive(Debug, Clone)]
pub(crate) struct CacheLayout {
    pub content: PathBuf,
    pub thumbnails: PathBuf,
    pub staging: PathBuf,
}

impl CacheLayout {
    fn content_file(&self, scope: &DriveScope, file_id: i64) -> PathBuf {
        self.content.join(scope_dir(scope)).join(file_id.to_string())
    }

    pub(crate) fn thumbnail_file(&self, scope: &DriveScope, file_id: i64) -> PathBuf {
        self.thumbnails
            .join(scope_dir(scope))
            .join(file_id.to_string())
    }

    fn staging_file(&self, scope: &DriveScope, parent_id: i64, name: &str) -> PathBuf {
        self.staging
            .join(scope_dir(scope))
            .join(parent_id.to_string())
            .join(staging_name(name))
    }
}

/// Single path component for a remote file name.
fn staging_name(name: &str) -> String {
    let name = name.replace(['/', '\\'], "_");
    if matches!(name.as_str(), "" | "." | "..") {
        return "_".repeat(name.len().max(1));
    }
    name
}

/// Result of [`ContentResolver::open`].
pub enum OpenedDocument {
    Read(Box<DynAsyncRead>),
    Write(WriteSession),
}

impl std::fmt::Debug for OpenedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenedDocument::Read(_) => f.write_str("OpenedDocument::Read"),
            OpenedDocument::Write(session) => f
                .debug_tuple("OpenedDocument::Write")
                .field(session)
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct ContentResolver {
    pub(crate) remote: Arc<dyn RemoteDriveClient>,
    mirror: Arc<dyn MirrorStore>,
    pub(crate) fs: Arc<dyn FileSystemAccess>,
    uploads: Arc<dyn UploadScheduler>,
    failures: Arc<dyn FailureReporter>,
    clock: Arc<dyn Clock>,
    registry: Arc<SessionRegistry>,
    notifier: Notifier,
    cache_dir: PathBuf,
    offline_dir: PathBuf,
    metadata_timeout: Duration,
    verify_offline_hashes: bool,
    layout: Arc<Mutex<Option<CacheLayout>>>,
    permission_notified: Arc<AtomicBool>,
}

impl ContentResolver {
    pub fn new(
        config: &ProviderConfig,
        registry: Arc<SessionRegistry>,
        notifier: Notifier,
    ) -> Self {
        Self {
            remote: Arc::clone(&config.remote_client),
            mirror: Arc::clone(&config.mirror_store),
            fs: Arc::clone(&config.file_system),
            uploads: Arc::clone(&config.upload_scheduler),
            failures: Arc::clone(&config.failure_reporter),
            clock: Arc::clone(&config.clock),
            registry,
            notifier,
            cache_dir: config.cache_dir.clone(),
            offline_dir: config.offline_dir.clone(),
            metadata_timeout: config.metadata_timeout,
            verify_offline_hashes: config.verify_offline_hashes,
            layout: Arc::new(Mutex::new(None)),
            permission_notified: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create the cache directories on first use.
    pub(crate) async fn layout(&self) -> Result<CacheLayout> {
        let mut guard = self.layout.lock().await;
        if let Some(layout) = guard.as_ref() {
            return Ok(layout.clone());
        }

        let layout = CacheLayout {
            content: self.cache_dir.join(CONTENT_DIR),
            thumbnails: self.cache_dir.join(THUMBNAIL_DIR),
            staging: self.cache_dir.join(STAGING_DIR),
        };
        for dir in [&layout.content, &layout.thumbnails, &layout.staging] {
            self.fs.create_dir_all(dir).await?;
        }
        info!(cache_dir = ?self.cache_dir, "Initialized content cache");

        *guard = Some(layout.clone());
        Ok(layout)
    }

    pub fn offline_file(&self, scope: &DriveScope, file_id: i64) -> PathBuf {
        self.offline_dir
            .join(scope_dir(scope))
            .join(file_id.to_string())
    }

    /// Open a document for reading or writing.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn open(&self, document_id: &DocumentId, mode: OpenMode) -> Result<OpenedDocument> {
        let reference = document_id.parse()?;
        let concrete = reference
            .concrete()
            .ok_or_else(|| DocumentsError::unsupported("open", document_id))?;

        if mode.is_write() {
            let session = self.open_for_write(document_id, concrete, mode).await?;
            Ok(OpenedDocument::Write(session))
        } else {
            let reader = self.open_for_read(document_id, concrete).await?;
            Ok(OpenedDocument::Read(reader))
        }
    }

    async fn open_for_read(
        &self,
        document_id: &DocumentId,
        concrete: &ConcreteRef,
    ) -> Result<Box<DynAsyncRead>> {
        let scope = concrete.scope();
        let local = self.mirror.get_file(&scope, concrete.file_id).await?;

        if let Some(record) = local.as_ref().filter(|r| r.is_offline && !r.is_folder) {
            if let Some(reader) = self.open_offline(&scope, record).await {
                debug!("Serving offline copy");
                return Ok(reader);
            }
        }

        let record = self
            .resolve_record(&scope, concrete.file_id, local)
            .await
            .ok_or_else(|| DocumentsError::not_found(document_id))?;
        if record.is_folder {
            return Err(DocumentsError::unsupported("open", document_id));
        }

        let layout = self.layout().await?;
        let cached = layout.content_file(&scope, record.id);

        if self.cache_is_fresh(&cached, &record).await {
            debug!("Serving cached copy");
            return Ok(self.fs.open_read_stream(&cached).await?);
        }

        match self.download_into_cache(&scope, &record, &cached).await {
            Ok(bytes) => {
                self.notifier
                    .emit(CoreEvent::Transfer(TransferEvent::DownloadCompleted {
                        document_id: document_id.to_string(),
                        bytes,
                    }));
                Ok(self.fs.open_read_stream(&cached).await?)
            }
            Err(e) if e.is_transient() && self.fs.exists(&cached).await.unwrap_or(false) => {
                warn!(error = %e, "Download failed; serving stale cached copy");
                Ok(self.fs.open_read_stream(&cached).await?)
            }
            Err(e) => {
                warn!(error = %e, "Download failed");
                Err(DocumentsError::from_read("open", e))
            }
        }
    }

    /// Prefer the drive service's record, but never wait longer than the
    /// metadata timeout for it.
    async fn resolve_record(
        &self,
        scope: &DriveScope,
        file_id: i64,
        local: Option<FileRecord>,
    ) -> Option<FileRecord> {
        match timeout(self.metadata_timeout, self.remote.get_file(scope, file_id)).await {
            Ok(Ok(record)) => Some(record),
            Ok(Err(e)) => {
                debug!(error = %e, "Remote record unavailable, using mirror");
                local
            }
            Err(_) => {
                debug!("Remote record lookup timed out, using mirror");
                local
            }
        }
    }

    async fn open_offline(
        &self,
        scope: &DriveScope,
        record: &FileRecord,
    ) -> Option<Box<DynAsyncRead>> {
        let path = self.offline_file(scope, record.id);
        if !self.offline_is_intact(&path, record).await {
            debug!(file_id = record.id, "Offline copy missing or damaged");
            return None;
        }
        match self.fs.open_read_stream(&path).await {
            Ok(reader) => Some(reader),
            Err(e) => {
                warn!(file_id = record.id, error = %e, "Offline copy unreadable");
                None
            }
        }
    }

    async fn offline_is_intact(&self, path: &Path, record: &FileRecord) -> bool {
        let Ok(metadata) = self.fs.metadata(path).await else {
            return false;
        };
        if metadata.is_directory
            || metadata.size != record.size
            || metadata.modified_at != Some(record.last_modified)
        {
            return false;
        }

        match (&record.sha256, self.verify_offline_hashes) {
            (Some(expected), true) => match self.fs.read_file(path).await {
                Ok(data) => calculate_hash(&data).eq_ignore_ascii_case(expected),
                Err(_) => false,
            },
            _ => true,
        }
    }

    async fn cache_is_fresh(&self, path: &Path, record: &FileRecord) -> bool {
        match self.fs.metadata(path).await {
            Ok(metadata) => {
                metadata.size == record.size && metadata.modified_at == Some(record.last_modified)
            }
            Err(_) => false,
        }
    }

    /// Stream a download into `<target>.part` and move it into place.
    async fn download_into_cache(
        &self,
        scope: &DriveScope,
        record: &FileRecord,
        target: &Path,
    ) -> BridgeResult<u64> {
        let part = target.with_extension(PART_EXTENSION);

        let result: BridgeResult<u64> = async {
            let mut reader = self.remote.download(scope, record.id).await?;
            let mut writer = self.fs.open_write_stream(&part).await?;
            let bytes = io::copy(&mut reader, &mut writer).await?;
            writer.shutdown().await?;
            drop(writer);

            self.fs.rename(&part, target).await?;
            self.fs.set_modified_time(target, record.last_modified).await?;
            Ok(bytes)
        }
        .await;

        match &result {
            Ok(bytes) => debug!(file_id = record.id, bytes, "Downloaded into cache"),
            Err(_) => {
                if let Err(e) = self.fs.remove_if_exists(&part).await {
                    debug!(error = %e, "Failed to remove partial download");
                }
            }
        }
        result
    }

    async fn open_for_write(
        &self,
        document_id: &DocumentId,
        concrete: &ConcreteRef,
        mode: OpenMode,
    ) -> Result<WriteSession> {
        let scope = concrete.scope();
        let local = self.mirror.get_file(&scope, concrete.file_id).await?;
        let record = self
            .resolve_record(&scope, concrete.file_id, local)
            .await
            .ok_or_else(|| DocumentsError::not_found(document_id))?;
        if record.is_folder {
            return Err(DocumentsError::unsupported("write", document_id));
        }

        let layout = self.layout().await?;
        let staging_path = layout.staging_file(&scope, record.parent_id, &record.name);
        let mut writer = self.fs.open_write_stream(&staging_path).await?;

        if mode.keeps_content() {
            let mut current = self.open_for_read(document_id, concrete).await?;
            io::copy(&mut current, &mut writer).await?;
        }

        {
            let staging_name = staging_path.to_string_lossy();
            debug!(staging = strip_path(&staging_name), ?mode, "Opened staging file");
        }
        Ok(WriteSession {
            writer,
            staging_path,
            document_id: document_id.clone(),
            scope,
            file_id: record.id,
            parent_id: record.parent_id,
            file_name: record.name,
            error: None,
            resolver: self.clone(),
        })
    }

    /// Provision an empty staging file for a freshly created document.
    pub async fn stage_new_file(
        &self,
        scope: &DriveScope,
        parent_id: i64,
        name: &str,
    ) -> Result<PathBuf> {
        let layout = self.layout().await?;
        let path = layout.staging_file(scope, parent_id, name);
        self.fs.write_file(&path, Bytes::new()).await?;
        Ok(path)
    }

    /// Drop cached content and thumbnail of a file. Best effort.
    pub async fn invalidate(&self, scope: &DriveScope, file_id: i64) {
        let layout = match self.layout().await {
            Ok(layout) => layout,
            Err(e) => {
                debug!(error = %e, "Cache layout unavailable, nothing to invalidate");
                return;
            }
        };
        for path in [
            layout.content_file(scope, file_id),
            layout.thumbnail_file(scope, file_id),
        ] {
            if let Err(e) = self.fs.remove_if_exists(&path).await {
                let name = path.to_string_lossy();
                debug!(
                    file = strip_path(&name),
                    error = %e,
                    "Failed to drop cached file"
                );
            }
        }
    }

    async fn queue_upload(&self, session: &WriteSession) -> Result<()> {
        let request = UploadRequest {
            user_id: session.scope.user_id,
            drive_id: session.scope.drive_id,
            shared_with_me: session.scope.shared_with_me,
            parent_id: session.parent_id,
            file_name: session.file_name.clone(),
            local_path: session.staging_path.clone(),
            last_modified: self.clock.unix_timestamp(),
        };
        self.uploads
            .enqueue_upload(request)
            .await
            .map_err(|e| DocumentsError::operation_failed("upload", e))?;

        if !self.uploads.has_background_permission().await
            && !self.permission_notified.swap(true, Ordering::AcqRel)
        {
            warn!("Background upload permission missing");
            self.notifier
                .emit(CoreEvent::Host(HostEvent::BackgroundPermissionMissing {
                    file_name: session.file_name.clone(),
                }));
        }

        self.invalidate(&session.scope, session.file_id).await;

        let parent = session.document_id.parent();
        self.notifier
            .emit(CoreEvent::Transfer(TransferEvent::UploadQueued {
                parent_document_id: parent
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                file_name: session.file_name.clone(),
            }));
        self.notifier.document_changed(&session.document_id);
        if let Some(parent) = &parent {
            self.registry.invalidate(parent);
            self.notifier.children_changed(parent);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("cache_dir", &self.cache_dir)
            .field("offline_dir", &self.offline_dir)
            .field("metadata_timeout", &self.metadata_timeout)
            .field("verify_offline_hashes", &self.verify_offline_hashes)
            .finish()
    }
}

fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Byte sink for a document opened in a writing mode.
///
/// Bytes go to a staging file. [`WriteSession::close`] finalizes the write;
/// dropping the session without closing it discards the write.
pub struct WriteSession {
    writer: Box<DynAsyncWrite>,
    staging_path: PathBuf,
    document_id: DocumentId,
    scope: DriveScope,
    file_id: i64,
    parent_id: i64,
    file_name: String,
    error: Option<io::Error>,
    resolver: ContentResolver,
}

impl WriteSession {
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Whether an I/O error was seen; such a session never uploads.
    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    fn record_error(&mut self, error: &io::Error) {
        if self.error.is_none() {
            self.error = Some(io::Error::new(error.kind(), error.to_string()));
        }
    }

    /// Flush the staging file and queue the upload.
    ///
    /// Any I/O error seen during the session is reported to the failure
    /// reporter and returned; nothing is uploaded in that case.
    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.writer.shutdown().await {
            self.record_error(&e);
        }

        if let Some(error) = self.error.take() {
            warn!(error = %error, "Staged write failed, upload skipped");
            self.resolver.failures.report("document write", &error);
            self.resolver
                .notifier
                .emit(CoreEvent::Transfer(TransferEvent::WriteFailed {
                    document_id: self.document_id.to_string(),
                    message: error.to_string(),
                }));
            return Err(DocumentsError::Io(error));
        }

        let resolver = self.resolver.clone();
        resolver.queue_upload(&self).await?;
        info!(file_name = %self.file_name, "Queued upload of staged write");
        Ok(())
    }
}

impl AsyncWrite for WriteSession {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.writer).poll_write(cx, buf);
        if let Poll::Ready(Err(e)) = &poll {
            this.record_error(e);
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.writer).poll_flush(cx);
        if let Poll::Ready(Err(e)) = &poll {
            this.record_error(e);
        }
        poll
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let poll = Pin::new(&mut this.writer).poll_shutdown(cx);
        if let Poll::Ready(Err(e)) = &poll {
            this.record_error(e);
        }
        poll
    }
}

impl std::fmt::Debug for WriteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteSession")
            .field("document_id", &self.document_id)
            .field("staging_path", &self.staging_path)
            .field("failed", &self.has_failed())
            .finish()
    }
}
