//! Core service façade and bootstrap helpers.
//!
//! [`DocumentsProvider`] is the integration point a host's document-provider
//! shell calls into. It wires a [`ProviderConfig`] into the core components and
//! accepts the host's string ids, sort orders and open modes. Desktop hosts
//! typically enable the `desktop-shims` feature, which supplies file-system and
//! failure-reporting defaults from `bridge-desktop`.
//!
//! ```ignore
//! use core_service::{DocumentsProvider, ProviderConfig};
//!
//! let config = ProviderConfig::builder()
//!     .remote_client(remote)
//!     .mirror_store(mirror)
//!     .account_directory(accounts)
//!     .upload_scheduler(uploads)
//!     .build()?;
//! let provider = DocumentsProvider::new(config)?;
//!
//! let table = provider.list_children("7/Work@42/1", Some("_display_name ASC"))?;
//! table.wait_until_loaded().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_documents::{
    DocumentFlags, DocumentId, DocumentRow, OpenMode, OpenedDocument, ResultTable, RootFlags,
    RootRow, WriteSession,
};
pub use core_runtime::config::{ProviderConfig, ProviderConfigBuilder};
pub use core_runtime::events::{
    ChangeAddress, CoreEvent, DocumentEvent, EventBus, EventStream, HostEvent, TransferEvent,
};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{DesktopDirectories, TokioFileSystem, TracingFailureReporter};

use bytes::Bytes;
use core_async::runtime::DedicatedRuntime;
use core_documents::{
    parse_sort_order, ContentResolver, CursorEngine, DocumentLookup, DocumentsError,
    MutationGateway, Notifier, RootEnumerator, SessionRegistry,
};
use std::sync::Arc;
use tracing::info;

/// Name of the background thread started by [`DocumentsProvider::new`].
pub const BACKGROUND_THREAD: &str = "drive-documents";

/// Primary façade exposed to host applications.
pub struct DocumentsProvider {
    authority: String,
    bus: EventBus,
    registry: Arc<SessionRegistry>,
    engine: CursorEngine,
    roots: RootEnumerator,
    lookup: DocumentLookup,
    content: ContentResolver,
    mutations: MutationGateway,
    background: Arc<DedicatedRuntime>,
}

impl DocumentsProvider {
    /// Build a provider with its own background thread.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let runtime = DedicatedRuntime::start(BACKGROUND_THREAD)
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
        Self::with_runtime(config, runtime)
    }

    /// Build a provider on an existing background context.
    pub fn with_runtime(config: ProviderConfig, runtime: DedicatedRuntime) -> Result<Self> {
        config.validate()?;

        let bus = EventBus::new(config.event_buffer_size);
        let notifier = Notifier::new(bus.clone(), &config.authority);
        let background = Arc::new(runtime);
        let registry = Arc::new(SessionRegistry::new(config.query_cache_ttl));

        let engine = CursorEngine::new(
            Arc::clone(&config.mirror_store),
            Arc::clone(&config.remote_client),
            Arc::clone(&registry),
            notifier.clone(),
            Arc::clone(&background),
        );
        let roots = RootEnumerator::new(
            Arc::clone(&config.account_directory),
            Arc::clone(&config.remote_client),
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
            Arc::clone(&config.remote_client),
            Arc::clone(&config.mirror_store),
            Arc::clone(&registry),
            content.clone(),
            notifier,
        );

        info!(
            authority = %config.authority,
            runtime = background.name(),
            "Documents provider ready"
        );

        Ok(Self {
            authority: config.authority,
            bus,
            registry,
            engine,
            roots,
            lookup,
            content,
            mutations,
            background,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub async fn list_roots(&self) -> Result<Vec<RootRow>> {
        Ok(self.roots.list_roots().await?)
    }

    pub async fn query_document(&self, document_id: &str) -> Result<DocumentRow> {
        let id: DocumentId = document_id.parse()?;
        Ok(self.lookup.query_document(&id).await?)
    }

    /// Live listing of `parent`. `sort_order` is the host's sort string.
    pub fn list_children(&self, parent: &str, sort_order: Option<&str>) -> Result<ResultTable> {
        let parent: DocumentId = parent.parse()?;
        let order = parse_sort_order(sort_order);
        Ok(self.engine.list_children(&parent, order)?)
    }

    /// Live search scoped to the last listed folder.
    pub fn search(&self, root_id: &str, query: &str) -> Result<ResultTable> {
        Ok(self.roots.search(root_id, query)?)
    }

    /// Open with a host mode string (`r`, `w`, `wt`, `rw`, `wa`).
    pub async fn open_document(&self, document_id: &str, mode: &str) -> Result<OpenedDocument> {
        let id: DocumentId = document_id.parse()?;
        let mode = OpenMode::parse(mode)?;
        Ok(self.content.open(&id, mode).await?)
    }

    /// Thumbnail bytes. The fetch runs on the background context.
    pub async fn open_thumbnail(&self, document_id: &str) -> Result<Bytes> {
        let id: DocumentId = document_id.parse()?;
        let content = self.content.clone();
        let thumbnail = self
            .background
            .spawn(async move { content.open_thumbnail(&id).await })
            .await
            .map_err(|e| DocumentsError::Task(e.to_string()))??;
        Ok(thumbnail)
    }

    pub async fn create_document(
        &self,
        parent: &str,
        mime_type: &str,
        display_name: &str,
    ) -> Result<DocumentId> {
        let parent: DocumentId = parent.parse()?;
        Ok(self
            .mutations
            .create_document(&parent, mime_type, display_name)
            .await?)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let id: DocumentId = document_id.parse()?;
        Ok(self.mutations.delete_document(&id).await?)
    }

    pub async fn rename_document(&self, document_id: &str, display_name: &str) -> Result<DocumentId> {
        let id: DocumentId = document_id.parse()?;
        Ok(self.mutations.rename_document(&id, display_name).await?)
    }

    pub async fn copy_document(&self, source: &str, target_parent: &str) -> Result<DocumentId> {
        let source: DocumentId = source.parse()?;
        let target: DocumentId = target_parent.parse()?;
        Ok(self.mutations.copy_document(&source, &target).await?)
    }

    pub async fn move_document(
        &self,
        source: &str,
        source_parent: &str,
        target_parent: &str,
    ) -> Result<DocumentId> {
        let source: DocumentId = source.parse()?;
        let from: DocumentId = source_parent.parse()?;
        let to: DocumentId = target_parent.parse()?;
        Ok(self.mutations.move_document(&source, &from, &to).await?)
    }

    /// Whether `document_id` lies below `parent`. String check only.
    pub fn is_child_document(&self, parent: &str, document_id: &str) -> bool {
        DocumentId::from(document_id).is_child_of(&DocumentId::from(parent))
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
    }

    /// Cancel the current session and stop the background context.
    pub fn shutdown(&self) {
        self.registry.cancel_current();
        self.background.shutdown();
        info!("Documents provider stopped");
    }
}

impl std::fmt::Debug for DocumentsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentsProvider")
            .field("authority", &self.authority)
            .field("registry", &self.registry)
            .field("runtime", &self.background.name())
            .finish()
    }
}
