use async_trait::async_trait;
use chrono::NaiveDate;
pub use skyslot_common::error::StoreError;
use skyslot_common::model::{ArchiveRecord, BlockSummary};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub public_id: String,
    pub overwrite: bool,
    /// Ask the store to purge CDN copies of a previous object under the same id.
    pub invalidate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
}

/// Image hosting.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(
        &self,
        local_path: &Path,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, StoreError>;
}

/// Block-structured document API holding the slots and the archive database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Direct children of `block_id`, in document order.
    async fn list_children(&self, block_id: &str) -> Result<Vec<BlockSummary>, StoreError>;

    async fn update_image_block(&self, block_id: &str, url: &str) -> Result<(), StoreError>;

    /// Append a record to the archive database, returning the new page id.
    async fn create_page(
        &self,
        database_id: &str,
        record: &ArchiveRecord,
    ) -> Result<String, StoreError>;

    /// Id of an existing archive record for `date`, if any.
    async fn find_record(
        &self,
        database_id: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, StoreError>;
}
