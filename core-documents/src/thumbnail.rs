//! Thumbnails: network first, cached copy as fallback.

use bytes::Bytes;
use tracing::{debug, instrument, warn};

use crate::content::ContentResolver;
use crate::error::{DocumentsError, Result};
use crate::identity::DocumentId;

impl ContentResolver {
    /// Fetch a thumbnail and keep it for offline use.
    ///
    /// Fails with [`DocumentsError::ThumbnailUnsupported`] when neither the
    /// drive service nor the cache has one, so the host can show an icon.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn open_thumbnail(&self, document_id: &DocumentId) -> Result<Bytes> {
        let reference = document_id.parse()?;
        let concrete = reference
            .concrete()
            .ok_or_else(|| DocumentsError::ThumbnailUnsupported(document_id.to_string()))?;
        let scope = concrete.scope();
        let path = self.layout().await?.thumbnail_file(&scope, concrete.file_id);

        match self.remote.thumbnail(&scope, concrete.file_id).await {
            Ok(data) => {
                if let Err(e) = self.fs.write_file(&path, data.clone()).await {
                    warn!(error = %e, "Failed to cache thumbnail");
                }
                Ok(data)
            }
            Err(e) => {
                debug!(error = %e, "Thumbnail fetch failed, trying cache");
                match self.fs.read_file(&path).await {
                    Ok(data) => Ok(data),
                    Err(_) => Err(DocumentsError::ThumbnailUnsupported(
                        document_id.to_string(),
                    )),
                }
            }
        }
    }
}
