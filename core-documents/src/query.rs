//! Single-document lookups. Served from the mirror and the account list only.

use bridge_traits::{AccountDirectory, MirrorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{DocumentsError, Result};
use crate::identity::{DocumentId, DocumentRef};
use crate::rows::DocumentRow;

pub struct DocumentLookup {
    accounts: Arc<dyn AccountDirectory>,
    mirror: Arc<dyn MirrorStore>,
}

impl DocumentLookup {
    pub fn new(accounts: Arc<dyn AccountDirectory>, mirror: Arc<dyn MirrorStore>) -> Self {
        Self { accounts, mirror }
    }

    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn query_document(&self, document_id: &DocumentId) -> Result<DocumentRow> {
        match document_id.parse()? {
            DocumentRef::Root { user_id } => {
                let users = self.accounts.users().await?;
                users
                    .iter()
                    .find(|user| user.id == user_id)
                    .map(DocumentRow::root)
                    .ok_or_else(|| DocumentsError::not_found(document_id))
            }
            DocumentRef::Synthetic { user_id, folder } => {
                Ok(DocumentRow::synthetic(user_id, folder))
            }
            DocumentRef::Concrete(concrete) => {
                let scope = concrete.scope();
                if concrete.is_drive_root() {
                    if !concrete.shared_with_me() {
                        let drives = self.mirror.drives(concrete.user_id).await?;
                        if let Some(drive) = drives.iter().find(|d| d.id == concrete.drive_id) {
                            return Ok(DocumentRow::drive(document_id.clone(), drive));
                        }
                    }
                    if let Some(record) = self.mirror.get_file(&scope, concrete.file_id).await? {
                        return Ok(DocumentRow::drive_folder(document_id.clone(), &record));
                    }
                } else if let Some(record) = self.mirror.get_file(&scope, concrete.file_id).await? {
                    return Ok(DocumentRow::file(document_id.clone(), &record));
                }

                debug!("Document not in mirror");
                Err(DocumentsError::not_found(document_id))
            }
        }
    }
}
