use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::errors::AppError;
use crate::events::{upcoming, Event};
use crate::metadata::images::resolve_image;
use crate::metadata::models::MetadataRecord;
use crate::state::AppState;
use crate::validation::validate_event_id;

/// An event as shown on a card: the feed fields plus what this service
/// adds on top (display image and notes).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    #[serde(flatten)]
    pub event: Event,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

impl EventCard {
    pub fn new(event: Event, metadata: &MetadataRecord) -> Self {
        Self {
            image: resolve_image(Some(&event), metadata),
            additional_info: metadata.additional_info.clone(),
            event,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub event_id: String,
    pub image: String,
}

/// GET /api/events
pub async fn handle_list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventCard>>, AppError> {
    let events = state.degrade_read("Listing events", state.events.list_events().await)?;
    let events = upcoming(events, Utc::now(), state.config.events_limit);
    let metadata = state.degrade_read("Listing metadata", state.metadata.list_all().await)?;

    let empty = MetadataRecord::default();
    Ok(Json(
        events
            .into_iter()
            .map(|event| {
                let meta = metadata.get(&event.id).unwrap_or(&empty);
                EventCard::new(event, meta)
            })
            .collect(),
    ))
}

/// GET /api/events/:event_id
pub async fn handle_get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventCard>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let event = state
        .events
        .find_event(&event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {event_id} not found")))?;
    let metadata = state.degrade_read("Reading metadata", state.metadata.get(&event_id).await)?;
    Ok(Json(EventCard::new(event, &metadata)))
}

/// GET /api/events/:event_id/image
///
/// Always resolves to something: an unknown event or an unreachable feed
/// only removes the description/location steps from the lookup.
pub async fn handle_event_image(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<ImageResponse>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let metadata = state.degrade_read("Reading metadata", state.metadata.get(&event_id).await)?;
    let event = match state.events.find_event(&event_id).await {
        Ok(event) => event,
        Err(e) => {
            warn!("Event feed unavailable while resolving image for {event_id}: {e}");
            None
        }
    };

    Ok(Json(ImageResponse {
        image: resolve_image(event.as_ref(), &metadata),
        event_id,
    }))
}
