//! # Cursor Sessions
//!
//! A [`CursorSession`] is the live, cancellable population of one listing or
//! search. The host reads it through [`ResultTable`] handles.
//!
//! [`SessionRegistry`] owns the single "current" session of a provider and the
//! last listing context. A query whose [`QueryKey`] equals the current one is
//! answered with a restored copy of the current rows while that session is
//! still loading, or completed less than the reuse TTL ago and not invalidated
//! by a mutation. Any other query cancels the current session and starts a
//! new one.

use bridge_traits::SortOrder;
use core_async::sync::{watch, CancellationToken};
use core_async::time::{Duration, Instant};
use core_runtime::events::ChangeAddress;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::identity::DocumentId;
use crate::rows::DocumentRow;

/// Value-comparable identity of a listing or search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Children {
        parent: DocumentId,
        order: SortOrder,
    },
    Search {
        root_id: String,
        query: String,
        /// Listing context the search is scoped to
        folder: DocumentId,
    },
}

impl QueryKey {
    /// Address the host watches for this query.
    pub fn address(&self) -> ChangeAddress {
        match self {
            QueryKey::Children { parent, .. } => ChangeAddress::children(parent.as_str()),
            QueryKey::Search { root_id, query, .. } => {
                ChangeAddress::search(root_id.as_str(), query.as_str())
            }
        }
    }

    fn folder(&self) -> &DocumentId {
        match self {
            QueryKey::Children { parent, .. } => parent,
            QueryKey::Search { folder, .. } => folder,
        }
    }
}

/// Background population of one result set.
pub struct CursorSession {
    id: Uuid,
    key: QueryKey,
    address: ChangeAddress,
    rows: RwLock<Vec<DocumentRow>>,
    loading: watch::Sender<bool>,
    token: CancellationToken,
    open_tables: AtomicUsize,
    completed_at: Mutex<Option<Instant>>,
    invalidated: AtomicBool,
}

impl CursorSession {
    fn new(key: QueryKey) -> Arc<Self> {
        let (loading, _) = watch::channel(true);
        Arc::new(Self {
            id: Uuid::new_v4(),
            address: key.address(),
            key,
            rows: RwLock::new(Vec::new()),
            loading,
            token: CancellationToken::new(),
            open_tables: AtomicUsize::new(0),
            completed_at: Mutex::new(None),
            invalidated: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn address(&self) -> &ChangeAddress {
        &self.address
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    /// Append a row unless the session was superseded or closed.
    pub fn push_row(&self, row: DocumentRow) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.rows.write().push(row);
        true
    }

    /// Clear the loading flag. Only the first call has an effect.
    pub fn finish(&self) {
        let mut completed_at = self.completed_at.lock();
        if completed_at.is_none() {
            *completed_at = Some(Instant::now());
            self.loading.send_replace(false);
        }
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(session = %self.id, "Cancelling cursor session");
            self.token.cancel();
        }
    }

    fn reusable(&self, ttl: Duration) -> bool {
        if self.is_cancelled() || self.invalidated.load(Ordering::Acquire) {
            return false;
        }
        match *self.completed_at.lock() {
            None => true,
            Some(completed) => completed.elapsed() < ttl,
        }
    }

    fn table(self: &Arc<Self>, restored: bool) -> ResultTable {
        self.open_tables.fetch_add(1, Ordering::AcqRel);
        let snapshot = restored.then(|| Snapshot {
            rows: self.rows.read().clone(),
            loading: self.is_loading(),
        });
        ResultTable {
            session: Arc::clone(self),
            snapshot,
            closed: AtomicBool::new(false),
        }
    }
}

impl std::fmt::Debug for CursorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorSession")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("rows", &self.row_count())
            .field("loading", &self.is_loading())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Snapshot {
    rows: Vec<DocumentRow>,
    loading: bool,
}

/// Host handle on a session's rows.
///
/// The table that started a session reads the rows live. A restored table is
/// a copy taken when the duplicate query arrived. Closing (or dropping) the
/// last table of a session that is still loading cancels its task.
pub struct ResultTable {
    session: Arc<CursorSession>,
    snapshot: Option<Snapshot>,
    closed: AtomicBool,
}

impl ResultTable {
    pub fn rows(&self) -> Vec<DocumentRow> {
        match &self.snapshot {
            Some(snapshot) => snapshot.rows.clone(),
            None => self.session.rows.read().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.snapshot {
            Some(snapshot) => snapshot.rows.len(),
            None => self.session.row_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        match &self.snapshot {
            Some(snapshot) => snapshot.loading,
            None => self.session.is_loading(),
        }
    }

    /// Whether this table is a copy served for a duplicate query.
    pub fn is_restored(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn notification_address(&self) -> &ChangeAddress {
        &self.session.address
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    /// Resolves once the bound session stops loading, including by cancellation.
    pub async fn wait_until_loaded(&self) {
        let mut receiver = self.session.loading.subscribe();
        let _ = receiver.wait_for(|loading| !*loading).await;
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let remaining = self.session.open_tables.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 && self.session.is_loading() {
            debug!(session = %self.session.id, "Last result table closed");
            self.session.cancel();
        }
    }
}

impl Drop for ResultTable {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ResultTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultTable")
            .field("session", &self.session.id)
            .field("rows", &self.len())
            .field("loading", &self.is_loading())
            .field("restored", &self.is_restored())
            .finish()
    }
}

/// Outcome of [`SessionRegistry::begin`].
pub enum Begin {
    /// Duplicate of the current query; no new work.
    Restored(ResultTable),
    /// A new current session the caller must populate.
    Started(ResultTable, Arc<CursorSession>),
}

#[derive(Default)]
struct RegistryState {
    current: Option<Arc<CursorSession>>,
    listing_context: Option<DocumentId>,
}

/// Per-provider owner of the current session and listing context.
pub struct SessionRegistry {
    ttl: Duration,
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn begin(&self, key: QueryKey) -> Begin {
        let mut state = self.state.lock();

        if let QueryKey::Children { parent, .. } = &key {
            state.listing_context = Some(parent.clone());
        }

        if let Some(current) = &state.current {
            if current.key == key && current.reusable(self.ttl) {
                debug!(session = %current.id, "Restoring result table for duplicate query");
                return Begin::Restored(current.table(true));
            }
            current.cancel();
        }

        let session = CursorSession::new(key);
        let table = session.table(false);
        state.current = Some(Arc::clone(&session));
        Begin::Started(table, session)
    }

    /// Last folder passed to a children listing.
    pub fn listing_context(&self) -> Option<DocumentId> {
        self.state.lock().listing_context.clone()
    }

    pub fn current_key(&self) -> Option<QueryKey> {
        self.state.lock().current.as_ref().map(|s| s.key.clone())
    }

    /// Stop serving cached rows for queries over `folder`.
    pub fn invalidate(&self, folder: &DocumentId) {
        let state = self.state.lock();
        if let Some(current) = &state.current {
            if current.key.folder() == folder {
                current.invalidated.store(true, Ordering::Release);
            }
        }
    }

    pub fn cancel_current(&self) {
        if let Some(current) = self.state.lock().current.take() {
            current.cancel();
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("ttl", &self.ttl)
            .field("current", &self.current_key())
            .finish()
    }
}
