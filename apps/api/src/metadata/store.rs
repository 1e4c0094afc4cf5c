use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::metadata::models::{MetadataPatch, MetadataRecord};
use crate::storage::{Collection, StorageError};

/// One metadata record per event, updated by field-wise merge.
///
/// Writers are serialized through `writes` (shared by every clone) so the
/// read-merge-write of one patch never interleaves with another.
#[derive(Clone)]
pub struct MetadataStore {
    collection: Arc<dyn Collection>,
    writes: Arc<Mutex<()>>,
}

impl MetadataStore {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self {
            collection,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Merges `patch` into the stored record (or an empty one) and writes
    /// the whole record back in a single put.
    pub async fn upsert(
        &self,
        event_id: &str,
        patch: MetadataPatch,
    ) -> Result<MetadataRecord, StorageError> {
        let _guard = self.writes.lock().await;
        let current = self.get(event_id).await?;
        let merged = current.merge(patch, Utc::now());
        self.collection
            .put(event_id, serde_json::to_value(&merged)?)
            .await?;

        info!("Updated metadata for event {event_id}");
        Ok(merged)
    }

    /// Returns the stored record, or an empty one if the event has none.
    pub async fn get(&self, event_id: &str) -> Result<MetadataRecord, StorageError> {
        match self.collection.get(event_id).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => {
                debug!("No metadata stored for event {event_id}");
                Ok(MetadataRecord::default())
            }
        }
    }

    pub async fn list_all(&self) -> Result<BTreeMap<String, MetadataRecord>, StorageError> {
        self.collection
            .scan("")
            .await?
            .into_iter()
            .map(|(event_id, value)| {
                let record: MetadataRecord = serde_json::from_value(value)?;
                Ok::<_, StorageError>((event_id, record))
            })
            .collect()
    }

    /// Removes the record. Deleting metadata that does not exist is a no-op.
    pub async fn delete(&self, event_id: &str) -> Result<bool, StorageError> {
        let _guard = self.writes.lock().await;
        let removed = self.collection.delete(event_id).await?;
        if removed {
            info!("Deleted metadata for event {event_id}");
        }
        Ok(removed)
    }
}
