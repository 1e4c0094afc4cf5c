// Read-only view of the external calendar. Events are never created or
// changed here; responses and metadata only refer to them by id.

pub mod handlers;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::StorageError;

/// A calendar item as supplied by the external feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    /// RFC 3339 instant, or `YYYY-MM-DD` for all-day events.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Event {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_event_time(&self.date)
    }

    /// End instant, falling back to the start when no end is given.
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .as_deref()
            .and_then(parse_event_time)
            .or_else(|| self.starts_at())
    }
}

pub fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Events that have not ended by `now`, soonest first, at most `limit`.
/// Events whose start cannot be parsed are dropped.
pub fn upcoming(events: Vec<Event>, now: DateTime<Utc>, limit: usize) -> Vec<Event> {
    let mut dated: Vec<(DateTime<Utc>, Event)> = events
        .into_iter()
        .filter_map(|event| match event.starts_at() {
            Some(start) => Some((start, event)),
            None => {
                warn!("Skipping event {} with unparseable date '{}'", event.id, event.date);
                None
            }
        })
        .filter(|(_, event)| event.ends_at().is_some_and(|end| end >= now))
        .collect();

    dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
    dated.into_iter().take(limit).map(|(_, e)| e).collect()
}

/// Source of calendar events. Swappable so the feed integration stays
/// outside this service.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>, StorageError>;

    async fn find_event(&self, event_id: &str) -> Result<Option<Event>, StorageError> {
        Ok(self
            .list_events()
            .await?
            .into_iter()
            .find(|e| e.id == event_id))
    }
}

/// Reads a locally cached mirror of the calendar feed: a JSON array of
/// events, re-read on every call so an external sync job can replace it.
/// Without a configured path there are simply no events.
pub struct MirrorEventSource {
    path: Option<PathBuf>,
}

impl MirrorEventSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl EventSource for MirrorEventSource {
    async fn list_events(&self) -> Result<Vec<Event>, StorageError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let bytes = tokio::fs::read(path).await?;
        let events: Vec<Event> = serde_json::from_slice(&bytes)?;
        debug!("Loaded {} events from {}", events.len(), path.display());
        Ok(events)
    }
}
