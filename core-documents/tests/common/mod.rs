//! Fakes shared by the core-documents integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::{
    error::{BridgeError, Result},
    AccountDirectory, Drive, DriveScope, DynAsyncRead, DynAsyncWrite, FailureReporter,
    FileMetadata, FilePage, FileRecord, FileSystemAccess, FixedClock, MirrorStore,
    RemoteDriveClient, SortOrder, SpecialFolder, UploadRequest, UploadScheduler, UserAccount,
};
use bytes::Bytes;
use core_async::io::AsyncWrite;
use core_async::runtime::DedicatedRuntime;
use core_async::sync::{Mutex as AsyncMutex, Notify};
use core_documents::{
    ContentResolver, CursorEngine, DocumentLookup, MutationGateway, Notifier, ResultTable,
    RootEnumerator, SessionRegistry,
};
use core_runtime::config::ProviderConfig;
use core_runtime::events::EventBus;
use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;

pub const USER_ID: i64 = 7;
pub const DRIVE_ID: i64 = 42;
pub const OTHER_DRIVE_ID: i64 = 43;
pub const NOW: i64 = 1_700_000_500;

pub fn scope() -> DriveScope {
    DriveScope::new(USER_ID, DRIVE_ID)
}

// ============================================================================
// Mock Implementations
// ============================================================================

/// Drive service with call counters.
pub struct FakeRemote {
    pub files: Arc<AsyncMutex<HashMap<i64, FileRecord>>>,
    pub contents: Arc<AsyncMutex<HashMap<i64, Vec<u8>>>>,
    pub thumbnails: Arc<AsyncMutex<HashMap<i64, Vec<u8>>>>,
    pub network_down: AtomicBool,
    pub reject_mutations: AtomicBool,
    pub fail_refresh: AtomicBool,
    next_id: AtomicI64,
    pub refresh_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub get_file_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub thumbnail_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            files: Arc::new(AsyncMutex::new(HashMap::new())),
            contents: Arc::new(AsyncMutex::new(HashMap::new())),
            thumbnails: Arc::new(AsyncMutex::new(HashMap::new())),
            network_down: AtomicBool::new(false),
            reject_mutations: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            next_id: AtomicI64::new(1000),
            refresh_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            get_file_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            thumbnail_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
        }
    }

    pub async fn put_file(&self, record: FileRecord, content: &[u8]) {
        self.contents
            .lock()
            .await
            .insert(record.id, content.to_vec());
        self.files.lock().await.insert(record.id, record);
    }

    /// Every call that reaches the drive service.
    pub fn total_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
            + self.search_calls.load(Ordering::SeqCst)
            + self.get_file_calls.load(Ordering::SeqCst)
            + self.download_calls.load(Ordering::SeqCst)
            + self.thumbnail_calls.load(Ordering::SeqCst)
            + self.mutation_calls.load(Ordering::SeqCst)
    }

    fn check_network(&self) -> Result<()> {
        if self.network_down.load(Ordering::SeqCst) {
            Err(BridgeError::Network("offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn begin_mutation(&self) -> Result<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        if self.reject_mutations.load(Ordering::SeqCst) {
            return Err(BridgeError::Remote {
                status: 403,
                message: "forbidden".to_string(),
            });
        }
        Ok(())
    }

    async fn existing(&self, file_id: i64) -> Result<FileRecord> {
        self.files
            .lock()
            .await
            .get(&file_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(file_id.to_string()))
    }

    async fn store(&self, record: FileRecord) -> FileRecord {
        self.files.lock().await.insert(record.id, record.clone());
        record
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDriveClient for FakeRemote {
    async fn refresh_drive_metadata(&self, _user_id: i64) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("refresh failed".to_string()));
        }
        Ok(())
    }

    async fn search(
        &self,
        _scope: &DriveScope,
        query: &str,
        _cursor: Option<String>,
    ) -> Result<FilePage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        let mut found: Vec<FileRecord> = self
            .files
            .lock()
            .await
            .values()
            .filter(|record| record.name.contains(query))
            .cloned()
            .collect();
        found.sort_by_key(|record| record.id);
        Ok((found, None))
    }

    async fn get_file(&self, _scope: &DriveScope, file_id: i64) -> Result<FileRecord> {
        self.get_file_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        self.existing(file_id).await
    }

    async fn download(&self, _scope: &DriveScope, file_id: i64) -> Result<Box<DynAsyncRead>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        let content = self
            .contents
            .lock()
            .await
            .get(&file_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(file_id.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(content)))
    }

    async fn thumbnail(&self, _scope: &DriveScope, file_id: i64) -> Result<Bytes> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        self.check_network()?;
        self.thumbnails
            .lock()
            .await
            .get(&file_id)
            .cloned()
            .map(Bytes::from)
            .ok_or_else(|| BridgeError::NotFound(file_id.to_string()))
    }

    async fn create_folder(
        &self,
        scope: &DriveScope,
        parent_id: i64,
        name: &str,
    ) -> Result<FileRecord> {
        self.begin_mutation()?;
        let record = FileRecord::folder(self.allocate_id(), parent_id, scope.drive_id, name);
        Ok(self.store(record).await)
    }

    async fn create_file(
        &self,
        scope: &DriveScope,
        parent_id: i64,
        name: &str,
    ) -> Result<FileRecord> {
        self.begin_mutation()?;
        let record =
            FileRecord::file(self.allocate_id(), parent_id, scope.drive_id, name, 0, NOW);
        Ok(self.store(record).await)
    }

    async fn rename(&self, _scope: &DriveScope, file_id: i64, new_name: &str) -> Result<FileRecord> {
        self.begin_mutation()?;
        let mut record = self.existing(file_id).await?;
        record.name = new_name.to_string();
        Ok(self.store(record).await)
    }

    async fn copy(
        &self,
        _scope: &DriveScope,
        file_id: i64,
        target_parent_id: i64,
    ) -> Result<FileRecord> {
        self.begin_mutation()?;
        let mut record = self.existing(file_id).await?;
        record.id = self.allocate_id();
        record.parent_id = target_parent_id;
        Ok(self.store(record).await)
    }

    async fn move_file(
        &self,
        _scope: &DriveScope,
        file_id: i64,
        target_parent_id: i64,
    ) -> Result<FileRecord> {
        self.begin_mutation()?;
        let mut record = self.existing(file_id).await?;
        record.parent_id = target_parent_id;
        Ok(self.store(record).await)
    }

    async fn delete(&self, _scope: &DriveScope, file_id: i64) -> Result<()> {
        self.begin_mutation()?;
        self.files.lock().await.remove(&file_id);
        Ok(())
    }
}

/// In-memory mirror that pages its listings.
pub struct FakeMirror {
    pub drives: Arc<AsyncMutex<Vec<Drive>>>,
    pub records: Arc<AsyncMutex<HashMap<(DriveScope, i64), FileRecord>>>,
    pub special: Arc<AsyncMutex<HashMap<SpecialFolder, Vec<FileRecord>>>>,
    pub page_size: usize,
    pub page_loads: AtomicUsize,
    pub fail_listings: AtomicBool,
    gate: Mutex<Option<(SortOrder, Arc<Notify>)>>,
}

impl FakeMirror {
    pub fn new(page_size: usize) -> Self {
        Self {
            drives: Arc::new(AsyncMutex::new(Vec::new())),
            records: Arc::new(AsyncMutex::new(HashMap::new())),
            special: Arc::new(AsyncMutex::new(HashMap::new())),
            page_size,
            page_loads: AtomicUsize::new(0),
            fail_listings: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    pub async fn add_drive(&self, id: i64, name: &str) {
        self.drives.lock().await.push(Drive {
            id,
            user_id: USER_ID,
            name: name.to_string(),
            can_create: true,
        });
    }

    pub async fn put(&self, scope: DriveScope, record: FileRecord) {
        self.records.lock().await.insert((scope, record.id), record);
    }

    pub async fn get(&self, scope: DriveScope, file_id: i64) -> Option<FileRecord> {
        self.records.lock().await.get(&(scope, file_id)).cloned()
    }

    pub fn page_loads(&self) -> usize {
        self.page_loads.load(Ordering::SeqCst)
    }

    /// Hold the first follow-up page of a listing in `order` until notified.
    pub fn gate(&self, order: SortOrder) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((order, Arc::clone(&notify)));
        notify
    }

    fn take_gate(&self, order: SortOrder) -> Option<Arc<Notify>> {
        let mut gate = self.gate.lock().unwrap();
        match gate.as_ref() {
            Some((gated, _)) if *gated == order => gate.take().map(|(_, notify)| notify),
            _ => None,
        }
    }

    fn page(&self, mut records: Vec<FileRecord>, order: SortOrder, cursor: Option<String>) -> FilePage {
        sort_records(&mut records, order);
        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (offset + self.page_size).min(records.len());
        let next = (end < records.len()).then(|| end.to_string());
        (records[offset.min(end)..end].to_vec(), next)
    }
}

pub fn sort_records(records: &mut [FileRecord], order: SortOrder) {
    match order {
        SortOrder::NameAsc => records.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::NameDesc => records.sort_by(|a, b| b.name.cmp(&a.name)),
        SortOrder::ModifiedAsc => records.sort_by_key(|r| r.last_modified),
        SortOrder::ModifiedDesc => records.sort_by_key(|r| std::cmp::Reverse(r.last_modified)),
        SortOrder::SizeAsc => records.sort_by_key(|r| r.size),
        SortOrder::SizeDesc => records.sort_by_key(|r| std::cmp::Reverse(r.size)),
    }
}

#[async_trait]
impl MirrorStore for FakeMirror {
    async fn drives(&self, user_id: i64) -> Result<Vec<Drive>> {
        Ok(self
            .drives
            .lock()
            .await
            .iter()
            .filter(|drive| drive.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_file(&self, scope: &DriveScope, file_id: i64) -> Result<Option<FileRecord>> {
        Ok(self.records.lock().await.get(&(*scope, file_id)).cloned())
    }

    async fn load_children_page(
        &self,
        scope: &DriveScope,
        folder_id: i64,
        order: SortOrder,
        cursor: Option<String>,
    ) -> Result<FilePage> {
        self.page_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_listings.load(Ordering::SeqCst) {
            return Err(BridgeError::Mirror("listing failed".to_string()));
        }
        if cursor.is_some() {
            if let Some(gate) = self.take_gate(order) {
                gate.notified().await;
            }
        }

        let children: Vec<FileRecord> = self
            .records
            .lock()
            .await
            .iter()
            .filter(|((s, id), record)| {
                s == scope && record.parent_id == folder_id && *id != folder_id
            })
            .map(|(_, record)| record.clone())
            .collect();
        Ok(self.page(children, order, cursor))
    }

    async fn load_special_page(
        &self,
        _user_id: i64,
        folder: SpecialFolder,
        order: SortOrder,
        cursor: Option<String>,
    ) -> Result<FilePage> {
        self.page_loads.fetch_add(1, Ordering::SeqCst);
        let records = self
            .special
            .lock()
            .await
            .get(&folder)
            .cloned()
            .unwrap_or_default();
        Ok(self.page(records, order, cursor))
    }

    async fn insert(&self, scope: &DriveScope, record: &FileRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert((*scope, record.id), record.clone());
        Ok(())
    }

    async fn update(&self, scope: &DriveScope, record: &FileRecord) -> Result<()> {
        self.insert(scope, record).await
    }

    async fn remove(&self, scope: &DriveScope, file_id: i64) -> Result<bool> {
        Ok(self.records.lock().await.remove(&(*scope, file_id)).is_some())
    }
}

pub struct FakeAccounts(pub Vec<UserAccount>);

#[async_trait]
impl AccountDirectory for FakeAccounts {
    async fn users(&self) -> Result<Vec<UserAccount>> {
        Ok(self.0.clone())
    }
}

pub fn account(id: i64) -> UserAccount {
    UserAccount {
        id,
        display_name: format!("User {id}"),
        email: format!("user{id}@example.com"),
    }
}

pub struct FakeUploads {
    pub queued: Arc<AsyncMutex<Vec<UploadRequest>>>,
    pub background_permission: AtomicBool,
}

impl FakeUploads {
    pub fn new() -> Self {
        Self {
            queued: Arc::new(AsyncMutex::new(Vec::new())),
            background_permission: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl UploadScheduler for FakeUploads {
    async fn enqueue_upload(&self, request: UploadRequest) -> Result<()> {
        self.queued.lock().await.push(request);
        Ok(())
    }

    async fn has_background_permission(&self) -> bool {
        self.background_permission.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<String>>,
}

impl FailureReporter for RecordingReporter {
    fn report(&self, context: &str, error: &(dyn std::error::Error + 'static)) {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{context}: {error}"));
    }
}

/// Writer that fails every write.
struct BrokenWriter;

impl AsyncWrite for BrokenWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Tokio file system whose write streams can be made to fail.
pub struct FlakyFs {
    inner: TokioFileSystem,
    pub fail_writes: AtomicBool,
}

impl FlakyFs {
    pub fn new() -> Self {
        Self {
            inner: TokioFileSystem::new(),
            fail_writes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FileSystemAccess for FlakyFs {
    async fn exists(&self, path: &Path) -> Result<bool> {
        self.inner.exists(path).await
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        self.inner.metadata(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.create_dir_all(path).await
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.inner.write_file(path, data).await
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        self.inner.delete_file(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.rename(from, to).await
    }

    async fn set_modified_time(&self, path: &Path, unix_secs: i64) -> Result<()> {
        self.inner.set_modified_time(path, unix_secs).await
    }

    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>> {
        self.inner.open_read_stream(path).await
    }

    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Ok(Box::new(BrokenWriter));
        }
        self.inner.open_write_stream(path).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub mirror: Arc<FakeMirror>,
    pub uploads: Arc<FakeUploads>,
    pub reporter: Arc<RecordingReporter>,
    pub fs: Arc<FlakyFs>,
    pub bus: EventBus,
    pub registry: Arc<SessionRegistry>,
    pub engine: CursorEngine,
    pub roots: RootEnumerator,
    pub lookup: DocumentLookup,
    pub content: ContentResolver,
    pub mutations: MutationGateway,
    pub config: ProviderConfig,
    _cache: TempDir,
    _offline: TempDir,
}

impl Harness {
    /// Must be called inside a Tokio runtime; background work runs on it.
    pub fn new(page_size: usize) -> Self {
        Self::with_remote(page_size, Arc::new(FakeRemote::new()), None)
    }

    pub fn with_remote(
        page_size: usize,
        remote: Arc<FakeRemote>,
        override_remote: Option<Arc<dyn RemoteDriveClient>>,
    ) -> Self {
        let cache = tempfile::tempdir().unwrap();
        let offline = tempfile::tempdir().unwrap();
        let mirror = Arc::new(FakeMirror::new(page_size));
        let uploads = Arc::new(FakeUploads::new());
        let reporter = Arc::new(RecordingReporter::default());
        let fs = Arc::new(FlakyFs::new());
        let client: Arc<dyn RemoteDriveClient> =
            override_remote.unwrap_or_else(|| remote.clone() as Arc<dyn RemoteDriveClient>);

        let config = ProviderConfig::builder()
            .cache_dir(cache.path())
            .offline_dir(offline.path())
            .metadata_timeout(Duration::from_secs(1))
            .remote_client(Arc::clone(&client))
            .mirror_store(mirror.clone())
            .account_directory(Arc::new(FakeAccounts(vec![account(USER_ID), account(8)])))
            .upload_scheduler(uploads.clone())
            .file_system(fs.clone())
            .failure_reporter(reporter.clone())
            .clock(Arc::new(FixedClock(NOW)))
            .build()
            .unwrap();

        let bus = EventBus::new(256);
        let notifier = Notifier::new(bus.clone(), &config.authority);
        let background = Arc::new(DedicatedRuntime::current("documents-test").unwrap());
        let registry = Arc::new(SessionRegistry::new(config.query_cache_ttl));

        let engine = CursorEngine::new(
            Arc::clone(&config.mirror_store),
            Arc::clone(&client),
            Arc::clone(&registry),
            notifier.clone(),
            Arc::clone(&background),
        );
        let roots = RootEnumerator::new(
            Arc::clone(&config.account_directory),
            Arc::clone(&client),
            engine.clone(),
            Arc::clone(&background),
            config.root_title.clone(),
        );
        let lookup = DocumentLookup::new(
            Arc::clone(&config.account_directory),
            Arc::clone(&config.mirror_store),
        );
        let content =
            ContentResolver::new(&config, Arc::clone(&registry), notifier.clone());
        let mutations = MutationGateway::new(
            Arc::clone(&client),
            Arc::clone(&config.mirror_store),
            Arc::clone(&registry),
            content.clone(),
            notifier,
        );

        Self {
            remote,
            mirror,
            uploads,
            reporter,
            fs,
            bus,
            registry,
            engine,
            roots,
            lookup,
            content,
            mutations,
            config,
            _cache: cache,
            _offline: offline,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self._cache.path()
    }

    pub fn offline_dir(&self) -> &Path {
        self._offline.path()
    }

    /// Drive 42 ("Work") with its root folder in the mirror.
    pub async fn with_work_drive(self) -> Self {
        self.mirror.add_drive(DRIVE_ID, "Work").await;
        self.mirror.add_drive(OTHER_DRIVE_ID, "Home").await;
        self.mirror
            .put(scope(), FileRecord::folder(1, 0, DRIVE_ID, "Work"))
            .await;
        self
    }

    /// Files `a.txt`..`e.txt` (ids 11..=15) in folder 5 of drive 42.
    pub async fn with_folder_of_five(self) -> Self {
        self.mirror
            .put(scope(), FileRecord::folder(5, 1, DRIVE_ID, "Reports"))
            .await;
        for (offset, name) in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"].iter().enumerate() {
            let id = 11 + offset as i64;
            self.mirror
                .put(
                    scope(),
                    FileRecord::file(id, 5, DRIVE_ID, *name, 10 * id as u64, NOW - id),
                )
                .await;
        }
        self
    }
}

/// Poll until `condition` holds, yielding to background tasks in between.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        core_async::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached");
}

pub fn names(table: &ResultTable) -> Vec<String> {
    table
        .rows()
        .into_iter()
        .map(|row| row.display_name)
        .collect()
}
