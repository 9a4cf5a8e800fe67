//! # Mutation Gateway
//!
//! Create, rename, copy, move and delete.
//!
//! Every operation follows the same steps:
//!
//! 1. Resolve the operands in the mirror; a miss fails with `NotFound` and no
//!    remote call is made
//! 2. Call the drive service; a rejection fails with `OperationFailed` and the
//!    mirror is left untouched
//! 3. Apply the result to the mirror
//! 4. Invalidate cached listings and content, then notify the affected parents

use bridge_traits::{DriveScope, FileRecord, MirrorStore, RemoteDriveClient};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::content::ContentResolver;
use crate::error::{DocumentsError, Result};
use crate::identity::{ConcreteRef, DocumentId};
use crate::notify::Notifier;
use crate::rows::DIRECTORY_MIME_TYPE;
use crate::session::SessionRegistry;

pub struct MutationGateway {
    remote: Arc<dyn RemoteDriveClient>,
    mirror: Arc<dyn MirrorStore>,
    registry: Arc<SessionRegistry>,
    content: ContentResolver,
    notifier: Notifier,
}

impl MutationGateway {
    pub fn new(
        remote: Arc<dyn RemoteDriveClient>,
        mirror: Arc<dyn MirrorStore>,
        registry: Arc<SessionRegistry>,
        content: ContentResolver,
        notifier: Notifier,
    ) -> Self {
        Self {
            remote,
            mirror,
            registry,
            content,
            notifier,
        }
    }

    /// Create a folder, or an empty file with a staged local copy.
    #[instrument(skip(self), fields(parent = %parent))]
    pub async fn create_document(
        &self,
        parent: &DocumentId,
        mime_type: &str,
        name: &str,
    ) -> Result<DocumentId> {
        let target = concrete(parent, "create")?;
        let scope = target.scope();
        let folder_id = self.resolve_folder(parent, &target, "create").await?;

        let created = if mime_type == DIRECTORY_MIME_TYPE {
            self.remote.create_folder(&scope, folder_id, name).await
        } else {
            self.remote.create_file(&scope, folder_id, name).await
        }
        .map_err(|e| DocumentsError::operation_failed("create", e))?;

        self.mirror.insert(&scope, &created).await?;

        if !created.is_folder {
            if let Err(e) = self
                .content
                .stage_new_file(&scope, created.parent_id, &created.name)
                .await
            {
                warn!(error = %e, "Failed to stage new file");
            }
        }

        self.refresh_children(parent);
        let id = parent.child(created.id);
        info!(document_id = %id, "Created document");
        Ok(id)
    }

    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn delete_document(&self, document_id: &DocumentId) -> Result<()> {
        let source = concrete(document_id, "delete")?;
        if source.is_drive_root() {
            return Err(DocumentsError::unsupported("delete", document_id));
        }
        let scope = source.scope();
        let record = self.resolve(document_id, &scope, source.file_id).await?;

        self.remote
            .delete(&scope, record.id)
            .await
            .map_err(|e| DocumentsError::operation_failed("delete", e))?;

        self.mirror.remove(&scope, record.id).await?;
        self.content.invalidate(&scope, record.id).await;

        if let Some(parent) = document_id.parent() {
            self.refresh_children(&parent);
        }
        self.notifier.document_changed(document_id);
        info!("Deleted document");
        Ok(())
    }

    /// Rename in place. The id is unchanged since it only carries file ids.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn rename_document(
        &self,
        document_id: &DocumentId,
        new_name: &str,
    ) -> Result<DocumentId> {
        let source = concrete(document_id, "rename")?;
        if source.is_drive_root() {
            return Err(DocumentsError::unsupported("rename", document_id));
        }
        let scope = source.scope();
        let record = self.resolve(document_id, &scope, source.file_id).await?;

        let renamed = self
            .remote
            .rename(&scope, record.id, new_name)
            .await
            .map_err(|e| DocumentsError::operation_failed("rename", e))?;

        self.mirror.update(&scope, &renamed).await?;

        if let Some(parent) = document_id.parent() {
            self.refresh_children(&parent);
        }
        self.notifier.document_changed(document_id);
        Ok(document_id.clone())
    }

    #[instrument(skip(self), fields(source = %source_id, target = %target_parent))]
    pub async fn copy_document(
        &self,
        source_id: &DocumentId,
        target_parent: &DocumentId,
    ) -> Result<DocumentId> {
        let source = concrete(source_id, "copy")?;
        if source.is_drive_root() {
            return Err(DocumentsError::unsupported("copy", source_id));
        }
        let target = concrete(target_parent, "copy")?;
        let scope = same_scope(source_id, &source, &target, "copy")?;

        let record = self.resolve(source_id, &scope, source.file_id).await?;
        let folder_id = self.resolve_folder(target_parent, &target, "copy").await?;

        let copied = self
            .remote
            .copy(&scope, record.id, folder_id)
            .await
            .map_err(|e| DocumentsError::operation_failed("copy", e))?;

        self.mirror.insert(&scope, &copied).await?;

        self.refresh_children(target_parent);
        Ok(target_parent.child(copied.id))
    }

    #[instrument(
        skip(self),
        fields(source = %source_id, from = %source_parent, to = %target_parent)
    )]
    pub async fn move_document(
        &self,
        source_id: &DocumentId,
        source_parent: &DocumentId,
        target_parent: &DocumentId,
    ) -> Result<DocumentId> {
        let source = concrete(source_id, "move")?;
        if source.is_drive_root() {
            return Err(DocumentsError::unsupported("move", source_id));
        }
        if source_id.parent().as_ref() != Some(source_parent) {
            warn!("Source parent does not contain the source document");
            return Err(DocumentsError::InvalidDocumentId(source_parent.to_string()));
        }
        let target = concrete(target_parent, "move")?;
        let scope = same_scope(source_id, &source, &target, "move")?;

        let record = self.resolve(source_id, &scope, source.file_id).await?;
        let folder_id = self.resolve_folder(target_parent, &target, "move").await?;

        let moved = self
            .remote
            .move_file(&scope, record.id, folder_id)
            .await
            .map_err(|e| DocumentsError::operation_failed("move", e))?;

        self.mirror.update(&scope, &moved).await?;
        self.content.invalidate(&scope, moved.id).await;

        self.refresh_children(source_parent);
        self.refresh_children(target_parent);
        self.notifier.document_changed(source_id);
        Ok(target_parent.child(moved.id))
    }

    async fn resolve(
        &self,
        document_id: &DocumentId,
        scope: &DriveScope,
        file_id: i64,
    ) -> Result<FileRecord> {
        self.mirror
            .get_file(scope, file_id)
            .await?
            .ok_or_else(|| DocumentsError::not_found(document_id))
    }

    /// Folder id of `folder`; drive roots resolve through the drive list.
    async fn resolve_folder(
        &self,
        folder: &DocumentId,
        target: &ConcreteRef,
        operation: &str,
    ) -> Result<i64> {
        let scope = target.scope();
        match self.mirror.get_file(&scope, target.file_id).await? {
            Some(record) if record.is_folder => Ok(record.id),
            Some(_) => Err(DocumentsError::unsupported(operation, folder)),
            None if target.is_drive_root() && !target.shared_with_me() => {
                let drives = self.mirror.drives(target.user_id).await?;
                if drives.iter().any(|d| d.id == target.drive_id) {
                    Ok(target.file_id)
                } else {
                    Err(DocumentsError::not_found(folder))
                }
            }
            None => Err(DocumentsError::not_found(folder)),
        }
    }

    fn refresh_children(&self, parent: &DocumentId) {
        self.registry.invalidate(parent);
        self.notifier.children_changed(parent);
    }
}

impl std::fmt::Debug for MutationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGateway").finish_non_exhaustive()
    }
}

fn concrete(document_id: &DocumentId, operation: &str) -> Result<ConcreteRef> {
    document_id
        .parse()?
        .concrete()
        .cloned()
        .ok_or_else(|| DocumentsError::unsupported(operation, document_id))
}

/// Copy and move never cross drive scopes.
fn same_scope(
    source_id: &DocumentId,
    source: &ConcreteRef,
    target: &ConcreteRef,
    operation: &str,
) -> Result<DriveScope> {
    let scope = source.scope();
    if scope != target.scope() {
        return Err(DocumentsError::unsupported(operation, source_id));
    }
    Ok(scope)
}
