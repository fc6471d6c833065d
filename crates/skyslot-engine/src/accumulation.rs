use crate::stores::{DocumentStore, StoreError};
use chrono::NaiveDate;
use skyslot_common::model::{ArchiveRecord, Artifact};
use std::sync::Arc;
use tracing::{debug, info};

/// Appends one archive record per day, carrying the first artifact's URL.
pub struct AccumulationTrigger {
    store: Arc<dyn DocumentStore>,
    database_id: Option<String>,
    trigger_hour: u32,
}

impl AccumulationTrigger {
    pub fn new(store: Arc<dyn DocumentStore>, database_id: Option<String>, trigger_hour: u32) -> Self {
        Self {
            store,
            database_id,
            trigger_hour,
        }
    }

    /// Fires only during `trigger_hour`, and only if the archive has no record
    /// for `local_date` yet. Returns whether a record was created.
    pub async fn maybe_record(
        &self,
        artifacts: &[Artifact],
        local_date: NaiveDate,
        local_hour: u32,
    ) -> Result<bool, StoreError> {
        if local_hour != self.trigger_hour {
            debug!(
                "Archive: hour {} is not trigger hour {}",
                local_hour, self.trigger_hour
            );
            return Ok(false);
        }
        let Some(database_id) = self.database_id.as_deref() else {
            debug!("Archive: no database configured");
            return Ok(false);
        };
        let Some(first) = artifacts.first() else {
            info!("Archive: nothing was published, no record for {}", local_date);
            return Ok(false);
        };

        if let Some(existing) = self.store.find_record(database_id, local_date).await? {
            info!("Archive: {} already recorded as {}", local_date, existing);
            return Ok(false);
        }

        let record = ArchiveRecord {
            title: local_date.format("%Y-%m-%d").to_string(),
            date: local_date,
            image_url: first.url.clone(),
        };
        let page_id = self.store.create_page(database_id, &record).await?;
        info!("Archive: recorded {} as {}", local_date, page_id);
        Ok(true)
    }
}
