use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::responses::models::{composite_id, ResponseRecord, ResponseType};
use crate::responses::statistics::{aggregate, Statistics};
use crate::storage::{Collection, StorageError};

/// Like/dislike responses, at most one per (event, participant) pair.
///
/// Inputs are expected to be validated already (see `crate::validation`).
#[derive(Clone)]
pub struct ResponseStore {
    collection: Arc<dyn Collection>,
}

impl ResponseStore {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self { collection }
    }

    /// Inserts the response, or overwrites type and timestamp of the one
    /// already recorded for this pair. Repeating a call is a no-op.
    pub async fn upsert(
        &self,
        event_id: &str,
        participant_id: &str,
        response_type: ResponseType,
        timestamp: DateTime<Utc>,
    ) -> Result<ResponseRecord, StorageError> {
        let record = ResponseRecord::new(event_id, participant_id, response_type, timestamp);
        self.collection
            .put(
                &storage_key(event_id, participant_id),
                serde_json::to_value(&record)?,
            )
            .await?;

        info!(
            "Recorded '{}' from participant {} on event {}",
            response_type, participant_id, event_id
        );
        Ok(record)
    }

    /// Withdraws a response. Returns whether one existed; a missing response
    /// is not an error.
    pub async fn delete(&self, event_id: &str, participant_id: &str) -> Result<bool, StorageError> {
        let removed = self
            .collection
            .delete(&storage_key(event_id, participant_id))
            .await?;
        if removed {
            info!("Removed response from participant {participant_id} on event {event_id}");
        } else {
            debug!("No response from participant {participant_id} on event {event_id} to remove");
        }
        Ok(removed)
    }

    pub async fn list_for_event(&self, event_id: &str) -> Result<Vec<ResponseRecord>, StorageError> {
        let records = self.decode_all(self.collection.scan(&event_prefix(event_id)).await?)?;
        debug!(
            "Loaded {} responses for event {event_id} from {}",
            records.len(),
            self.collection.name()
        );
        Ok(records)
    }

    pub async fn list_all(&self) -> Result<Vec<ResponseRecord>, StorageError> {
        self.decode_all(self.collection.scan("").await?)
    }

    pub async fn list_grouped_by_event(
        &self,
    ) -> Result<BTreeMap<String, Vec<ResponseRecord>>, StorageError> {
        let mut grouped: BTreeMap<String, Vec<ResponseRecord>> = BTreeMap::new();
        for record in self.list_all().await? {
            grouped.entry(record.event_id.clone()).or_default().push(record);
        }
        Ok(grouped)
    }

    pub async fn statistics(&self) -> Result<Statistics, StorageError> {
        let records = self.list_all().await?;
        Ok(aggregate(&records))
    }

    fn decode_all(
        &self,
        rows: Vec<(String, serde_json::Value)>,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        rows.into_iter()
            .map(|(_, value)| serde_json::from_value(value).map_err(StorageError::from))
            .collect()
    }
}

/// Collection key for a response. The wire id `eventId_participantId` is
/// ambiguous once either id contains `_`, so the key carries the byte
/// length of the event id in front: `<len>:<eventId>_<participantId>`.
fn storage_key(event_id: &str, participant_id: &str) -> String {
    format!("{}:{}", event_id.len(), composite_id(event_id, participant_id))
}

/// Key prefix shared by every response to `event_id` and by nothing else.
fn event_prefix(event_id: &str) -> String {
    format!("{}:{event_id}_", event_id.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCollection;
    use chrono::TimeZone;

    fn store() -> ResponseStore {
        ResponseStore::new(Arc::new(MemoryCollection::new("event_responses")))
    }

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 10, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let s = store();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();

        let all = s.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], ResponseRecord::new("e1", "u1", ResponseType::Like, t(0)));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let s = store();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();
        s.upsert("e1", "u1", ResponseType::Dislike, t(5)).await.unwrap();

        let responses = s.list_for_event("e1").await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].response_type, ResponseType::Dislike);
        assert_eq!(responses[0].timestamp, t(5));
        assert_eq!(responses[0].id, "e1_u1");
    }

    #[tokio::test]
    async fn test_one_record_per_pair() {
        let s = store();
        for (e, u) in [("e1", "u1"), ("e1", "u2"), ("e2", "u1"), ("e1", "u1"), ("e2", "u1")] {
            s.upsert(e, u, ResponseType::Like, t(1)).await.unwrap();
        }
        let all = s.list_all().await.unwrap();
        assert_eq!(all.len(), 3);
        let mut pairs: Vec<_> = all
            .iter()
            .map(|r| (r.event_id.as_str(), r.participant_id.as_str()))
            .collect();
        pairs.dedup();
        assert_eq!(pairs.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok_and_changes_nothing() {
        let s = store();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();

        assert!(!s.delete("e1", "ghost").await.unwrap());
        assert!(!s.delete("nope", "u1").await.unwrap());
        assert_eq!(s.list_all().await.unwrap().len(), 1);

        assert!(s.delete("e1", "u1").await.unwrap());
        assert!(s.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_for_event_ignores_prefix_collisions() {
        let s = store();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();
        // key "e1_x_u9" shares the "e1_" prefix but belongs to event "e1_x"
        s.upsert("e1_x", "u9", ResponseType::Dislike, t(0)).await.unwrap();

        let e1 = s.list_for_event("e1").await.unwrap();
        assert_eq!(e1.len(), 1);
        assert_eq!(e1[0].participant_id, "u1");
        assert_eq!(s.list_for_event("e1_x").await.unwrap().len(), 1);
        assert!(s.list_for_event("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_underscored_ids_do_not_share_a_record() {
        let s = store();
        // both pairs join to the wire id "e1_x_u9"
        s.upsert("e1_x", "u9", ResponseType::Like, t(0)).await.unwrap();
        s.upsert("e1", "x_u9", ResponseType::Dislike, t(1)).await.unwrap();

        assert_eq!(s.list_all().await.unwrap().len(), 2);
        let e1_x = s.list_for_event("e1_x").await.unwrap();
        assert_eq!(e1_x.len(), 1);
        assert_eq!(e1_x[0].participant_id, "u9");
        assert_eq!(e1_x[0].response_type, ResponseType::Like);
        assert_eq!(e1_x[0].id, "e1_x_u9");

        let e1 = s.list_for_event("e1").await.unwrap();
        assert_eq!(e1.len(), 1);
        assert_eq!(e1[0].participant_id, "x_u9");
        assert_eq!(e1[0].id, "e1_x_u9");
    }

    #[tokio::test]
    async fn test_delete_only_touches_its_own_pair() {
        let s = store();
        s.upsert("e1_x", "u9", ResponseType::Like, t(0)).await.unwrap();

        assert!(!s.delete("e1", "x_u9").await.unwrap());
        assert_eq!(s.list_for_event("e1_x").await.unwrap().len(), 1);

        assert!(s.delete("e1_x", "u9").await.unwrap());
        assert!(s.list_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_storage_key_layout() {
        assert_eq!(storage_key("e1", "u1"), "2:e1_u1");
        assert!(storage_key("e1", "u1").starts_with(&event_prefix("e1")));
        assert!(!storage_key("e1_x", "u9").starts_with(&event_prefix("e1")));
    }

    #[tokio::test]
    async fn test_grouped_by_event() {
        let s = store();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();
        s.upsert("e1", "u2", ResponseType::Dislike, t(0)).await.unwrap();
        s.upsert("e2", "u1", ResponseType::Like, t(0)).await.unwrap();

        let grouped = s.list_grouped_by_event().await.unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["e1"].len(), 2);
        assert_eq!(grouped["e2"].len(), 1);
    }

    #[tokio::test]
    async fn test_statistics_after_withdrawal_drops_empty_event() {
        let s = store();
        s.upsert("e1", "u1", ResponseType::Like, t(0)).await.unwrap();
        s.upsert("e2", "u1", ResponseType::Dislike, t(0)).await.unwrap();
        s.delete("e2", "u1").await.unwrap();

        let stats = s.statistics().await.unwrap();
        assert!(!stats.events.contains_key("e2"));
        assert_eq!(stats.totals.event_count, 1);
        assert_eq!(stats.totals.likes, 1);
    }

    #[tokio::test]
    async fn test_malformed_stored_record_is_an_error() {
        let collection = Arc::new(MemoryCollection::new("event_responses"));
        collection
            .put("e1_u1", serde_json::json!({"responseType": "love"}))
            .await
            .unwrap();
        let s = ResponseStore::new(collection);
        assert!(matches!(
            s.list_all().await,
            Err(StorageError::Serialization(_))
        ));
    }
}
