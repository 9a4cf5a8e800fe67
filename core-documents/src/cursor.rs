//! # Cursor Engine
//!
//! Populates result tables in the background, one page at a time.
//!
//! ## Workflow
//!
//! 1. Decode the parent id into a [`ListingSource`]
//! 2. Ask the [`SessionRegistry`] for a session; a duplicate query gets a
//!    restored table and no new work
//! 3. Spawn the population task on the dedicated runtime
//! 4. Append each page, then notify the session address
//! 5. Clear the loading flag and notify once more
//!
//! The task checks its session token before each page, after each await and
//! before each row, so a superseded or closed session never publishes rows.

use bridge_traits::{
    error::Result as BridgeResult, DriveScope, MirrorStore, RemoteDriveClient, SortOrder,
    SpecialFolder, DRIVE_ROOT_FOLDER_ID,
};
use core_async::runtime::DedicatedRuntime;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::identity::{DocumentId, DocumentRef};
use crate::notify::Notifier;
use crate::rows::DocumentRow;
use crate::session::{Begin, CursorSession, QueryKey, ResultTable, SessionRegistry};

/// What a session lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    /// The drives of a user plus the two grouping folders
    Drives { user_id: i64 },
    /// A grouping folder
    Special {
        user_id: i64,
        folder: SpecialFolder,
        order: SortOrder,
    },
    /// A real folder
    Folder {
        scope: DriveScope,
        folder_id: i64,
        order: SortOrder,
    },
    /// Remote search inside a drive
    Search { scope: DriveScope, query: String },
}

impl ListingSource {
    pub fn for_children(reference: &DocumentRef, order: SortOrder) -> Self {
        match reference {
            DocumentRef::Root { user_id } => ListingSource::Drives { user_id: *user_id },
            DocumentRef::Synthetic { user_id, folder } => ListingSource::Special {
                user_id: *user_id,
                folder: *folder,
                order,
            },
            DocumentRef::Concrete(concrete) => ListingSource::Folder {
                scope: concrete.scope(),
                folder_id: concrete.file_id,
                order,
            },
        }
    }
}

type RowPage = (Vec<DocumentRow>, Option<String>);

#[derive(Clone)]
pub struct CursorEngine {
    mirror: Arc<dyn MirrorStore>,
    remote: Arc<dyn RemoteDriveClient>,
    registry: Arc<SessionRegistry>,
    notifier: Notifier,
    background: Arc<DedicatedRuntime>,
}

impl CursorEngine {
    pub fn new(
        mirror: Arc<dyn MirrorStore>,
        remote: Arc<dyn RemoteDriveClient>,
        registry: Arc<SessionRegistry>,
        notifier: Notifier,
        background: Arc<DedicatedRuntime>,
    ) -> Self {
        Self {
            mirror,
            remote,
            registry,
            notifier,
            background,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// List the children of `parent` into a live table.
    ///
    /// Returns immediately; rows arrive while the table reports loading.
    #[instrument(skip(self), fields(parent = %parent))]
    pub fn list_children(&self, parent: &DocumentId, order: SortOrder) -> Result<ResultTable> {
        let reference = parent.parse()?;
        let source = ListingSource::for_children(&reference, order);
        let key = QueryKey::Children {
            parent: parent.clone(),
            order,
        };
        Ok(self.launch(key, parent.clone(), source))
    }

    /// Start or restore the session for `key`.
    ///
    /// Row ids are built by appending to `base`.
    pub fn launch(&self, key: QueryKey, base: DocumentId, source: ListingSource) -> ResultTable {
        match self.registry.begin(key) {
            Begin::Restored(table) => table,
            Begin::Started(table, session) => {
                debug!(session = %session.id(), "Starting cursor session");
                let engine = self.clone();
                // Owned by the task so a stopped runtime dropping it unpolled
                // still ends the session.
                let finish = FinishOnDrop(Arc::clone(&session));
                self.background.spawn(async move {
                    let _finish = finish;
                    engine.populate(session, base, source).await
                });
                table
            }
        }
    }

    #[instrument(skip_all, fields(session = %session.id()))]
    async fn populate(&self, session: Arc<CursorSession>, base: DocumentId, source: ListingSource) {
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            if session.is_cancelled() {
                debug!(pages, "Session superseded before next page");
                return;
            }

            let page = self.load_page(&base, &source, cursor.take()).await;

            if session.is_cancelled() {
                debug!(pages, "Session superseded while loading page");
                return;
            }

            let (rows, next) = match page {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, pages, "Listing page failed");
                    self.notifier
                        .listing_failed(session.address().clone(), e.to_string());
                    break;
                }
            };

            for row in rows {
                if !session.push_row(row) {
                    debug!(pages, "Session superseded while appending rows");
                    return;
                }
            }
            pages += 1;
            self.notifier.changed(session.address().clone());

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        session.finish();
        debug!(pages, rows = session.row_count(), "Cursor session complete");
        self.notifier.changed(session.address().clone());
    }

    async fn load_page(
        &self,
        base: &DocumentId,
        source: &ListingSource,
        cursor: Option<String>,
    ) -> BridgeResult<RowPage> {
        match source {
            ListingSource::Drives { user_id } => {
                let drives = self.mirror.drives(*user_id).await?;
                let mut rows: Vec<DocumentRow> = drives
                    .iter()
                    .map(|drive| {
                        let id = base.drive_child(&drive.name, drive.id, DRIVE_ROOT_FOLDER_ID);
                        DocumentRow::drive(id, drive)
                    })
                    .collect();
                rows.push(DocumentRow::synthetic(*user_id, SpecialFolder::MyShares));
                rows.push(DocumentRow::synthetic(*user_id, SpecialFolder::SharedWithMe));
                Ok((rows, None))
            }
            ListingSource::Special {
                user_id,
                folder,
                order,
            } => {
                let (records, next) = self
                    .mirror
                    .load_special_page(*user_id, *folder, *order, cursor)
                    .await?;
                let names: HashMap<i64, String> = self
                    .mirror
                    .drives(*user_id)
                    .await?
                    .into_iter()
                    .map(|drive| (drive.id, drive.name))
                    .collect();

                let rows = records
                    .iter()
                    .map(|record| {
                        let name = names
                            .get(&record.drive_id)
                            .cloned()
                            .unwrap_or_else(|| format!("drive-{}", record.drive_id));
                        let id = base.drive_child(&name, record.drive_id, record.id);
                        DocumentRow::file(id, record)
                    })
                    .collect();
                Ok((rows, next))
            }
            ListingSource::Folder {
                scope,
                folder_id,
                order,
            } => {
                let (records, next) = self
                    .mirror
                    .load_children_page(scope, *folder_id, *order, cursor)
                    .await?;
                let rows = records
                    .iter()
                    .map(|record| DocumentRow::file(base.child(record.id), record))
                    .collect();
                Ok((rows, next))
            }
            ListingSource::Search { scope, query } => {
                let (records, next) = self.remote.search(scope, query, cursor).await?;
                let rows = records
                    .iter()
                    .map(|record| DocumentRow::file(base.child(record.id), record))
                    .collect();
                Ok((rows, next))
            }
        }
    }
}

impl std::fmt::Debug for CursorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorEngine")
            .field("registry", &self.registry)
            .field("runtime", &self.background.name())
            .finish()
    }
}

/// Clears the loading flag however the task ends.
struct FinishOnDrop(Arc<CursorSession>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}
