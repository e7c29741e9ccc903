use tracing::{debug, error, warn};

use snapgram_shared::models::FileUpload;
use snapgram_shared::types::FileId;

use super::Api;
use crate::error::ApiResult;
use crate::remote::PreviewOptions;

/// A freshly uploaded file with its preview URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadedMedia {
    pub file_id: FileId,
    pub url: String,
}

impl Api {
    pub fn file_preview_url(&self, file_id: &FileId) -> ApiResult<String> {
        Ok(self.remote.file_preview_url(
            &self.config.storage_id,
            file_id,
            &PreviewOptions::default(),
        )?)
    }

    pub async fn upload_file(&self, file: FileUpload) -> ApiResult<FileId> {
        let uploaded = self
            .remote
            .upload_file(&self.config.storage_id, &FileId::unique(), file)
            .await?;
        debug!(file_id = %uploaded.id, size = uploaded.size, "File uploaded");
        Ok(uploaded.id)
    }

    pub async fn delete_file(&self, file_id: &FileId) -> ApiResult<()> {
        self.remote
            .delete_file(&self.config.storage_id, file_id)
            .await?;
        debug!(%file_id, "File deleted");
        Ok(())
    }

    /// Upload then resolve the preview URL. The file is deleted again if
    /// the preview cannot be produced.
    pub(crate) async fn upload_media(&self, file: FileUpload) -> ApiResult<UploadedMedia> {
        let file_id = self.upload_file(file).await?;
        match self.file_preview_url(&file_id) {
            Ok(url) => Ok(UploadedMedia { file_id, url }),
            Err(e) => {
                warn!(%file_id, error = %e, "Preview failed, removing upload");
                self.discard_file(&file_id).await;
                Err(e)
            }
        }
    }

    /// Best-effort delete. Failures are logged and never retried.
    pub(crate) async fn discard_file(&self, file_id: &FileId) {
        if let Err(e) = self.delete_file(file_id).await {
            error!(%file_id, error = %e, "Failed to delete orphaned file");
        }
    }
}
