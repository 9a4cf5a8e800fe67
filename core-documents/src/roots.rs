//! Root/Search Enumerator.

use bridge_traits::{AccountDirectory, RemoteDriveClient};
use core_async::runtime::DedicatedRuntime;
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::cursor::{CursorEngine, ListingSource};
use crate::error::{DocumentsError, Result};
use crate::identity::DocumentRef;
use crate::rows::RootRow;
use crate::session::{QueryKey, ResultTable};

pub struct RootEnumerator {
    accounts: Arc<dyn AccountDirectory>,
    remote: Arc<dyn RemoteDriveClient>,
    engine: CursorEngine,
    background: Arc<DedicatedRuntime>,
    root_title: String,
}

impl RootEnumerator {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        remote: Arc<dyn RemoteDriveClient>,
        engine: CursorEngine,
        background: Arc<DedicatedRuntime>,
        root_title: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            remote,
            engine,
            background,
            root_title: root_title.into(),
        }
    }

    /// One root per signed-in account.
    ///
    /// Each call also schedules a drive metadata refresh per user. Those
    /// refreshes never delay or fail the listing.
    #[instrument(skip(self))]
    pub async fn list_roots(&self) -> Result<Vec<RootRow>> {
        let users = self.accounts.users().await?;

        for user in &users {
            debug!(
                user_id = user.id,
                email = %redact_if_sensitive("email", &user.email),
                "Scheduling drive metadata refresh"
            );
            let remote = Arc::clone(&self.remote);
            let user_id = user.id;
            self.background.spawn(async move {
                if let Err(e) = remote.refresh_drive_metadata(user_id).await {
                    debug!(user_id, error = %e, "Drive metadata refresh failed");
                }
            });
        }

        Ok(users
            .iter()
            .map(|user| RootRow::for_user(user, &self.root_title))
            .collect())
    }

    /// Search the drive of the last listed folder.
    ///
    /// Fails with [`DocumentsError::SelectionRequired`] unless that folder
    /// is a real folder of the user owning `root_id`.
    #[instrument(skip(self, query), fields(root_id = %root_id))]
    pub fn search(&self, root_id: &str, query: &str) -> Result<ResultTable> {
        let context = self
            .engine
            .registry()
            .listing_context()
            .ok_or(DocumentsError::SelectionRequired)?;

        let concrete = match context.parse()? {
            DocumentRef::Concrete(concrete) => concrete,
            DocumentRef::Root { .. } | DocumentRef::Synthetic { .. } => {
                info!(context = %context, "Search rejected outside a drive");
                return Err(DocumentsError::SelectionRequired);
            }
        };
        if concrete.user_id.to_string() != root_id {
            info!(context = %context, "Search rejected for another account");
            return Err(DocumentsError::SelectionRequired);
        }

        let key = QueryKey::Search {
            root_id: root_id.to_string(),
            query: query.to_string(),
            folder: context.clone(),
        };
        let source = ListingSource::Search {
            scope: concrete.scope(),
            query: query.to_string(),
        };
        Ok(self.engine.launch(key, context, source))
    }
}

impl std::fmt::Debug for RootEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootEnumerator")
            .field("root_title", &self.root_title)
            .finish()
    }
}
