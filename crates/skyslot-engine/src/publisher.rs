use crate::stores::{ArtifactStore, StoreError, UploadOptions};
use chrono::{DateTime, Utc};
use skyslot_common::model::{Artifact, CaptureResult};
use skyslot_common::slug::slugify;
use std::sync::Arc;
use tracing::info;

/// Uploads captures under ids that are new on every run, so neither the
/// store nor any CDN in front of it can serve a previous image.
pub struct ArtifactPublisher {
    store: Arc<dyn ArtifactStore>,
    folder: Option<String>,
}

impl ArtifactPublisher {
    pub fn new(store: Arc<dyn ArtifactStore>, folder: Option<String>) -> Self {
        Self { store, folder }
    }

    pub async fn publish(&self, capture: &CaptureResult) -> Result<Artifact, StoreError> {
        let remote_id = remote_id(self.folder.as_deref(), &capture.name, capture.captured_at);
        let options = UploadOptions {
            public_id: remote_id.clone(),
            overwrite: true,
            invalidate: true,
        };

        let uploaded = self.store.upload(&capture.local_path, &options).await?;
        info!("[{}] published {} -> {}", capture.name, remote_id, uploaded.url);

        Ok(Artifact {
            source: capture.clone(),
            remote_id,
            url: uploaded.url,
        })
    }
}

/// `[folder/]slug_YYYYMMDDTHHMMSSmmmZ`
pub fn remote_id(folder: Option<&str>, name: &str, captured_at: DateTime<Utc>) -> String {
    let id = format!(
        "{}_{}",
        slugify(name),
        captured_at.format("%Y%m%dT%H%M%S%3fZ")
    );
    match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/{}", folder, id),
        None => id,
    }
}
