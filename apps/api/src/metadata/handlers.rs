use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::errors::AppError;
use crate::metadata::models::{MetadataPatch, MetadataRecord};
use crate::routes::Ack;
use crate::state::AppState;
use crate::validation::validate_event_id;

/// GET /api/events/:event_id/metadata
pub async fn handle_get_metadata(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<MetadataRecord>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let record = state.degrade_read("Reading metadata", state.metadata.get(&event_id).await)?;
    Ok(Json(record))
}

/// POST /api/events/:event_id/metadata
pub async fn handle_upsert_metadata(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(patch): Json<MetadataPatch>,
) -> Result<Json<Ack>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let patch = patch.validated()?;
    if patch.is_empty() {
        debug!("Empty metadata patch for event {event_id}, only stamping lastUpdated");
    }
    state.metadata.upsert(&event_id, patch).await?;
    Ok(Json(Ack::ok("Metadata updated successfully")))
}

/// DELETE /api/events/:event_id/metadata
pub async fn handle_delete_metadata(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Ack>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let removed = state.metadata.delete(&event_id).await?;
    let message = if removed {
        "Metadata deleted"
    } else {
        "No metadata to delete"
    };
    Ok(Json(Ack::ok(message)))
}

/// GET /api/metadata
pub async fn handle_list_metadata(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, MetadataRecord>>, AppError> {
    let all = state.degrade_read("Listing metadata", state.metadata.list_all().await)?;
    Ok(Json(all))
}
