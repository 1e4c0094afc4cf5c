use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::errors::AppError;
use crate::responses::models::{RespondRequest, ResponseView};
use crate::responses::statistics::Statistics;
use crate::routes::Ack;
use crate::state::AppState;
use crate::validation::{
    parse_response_type, resolve_timestamp, validate_event_id, validate_participant_id,
};

/// GET /api/events/:event_id/responses
pub async fn handle_list_responses(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<ResponseView>>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let records = state.degrade_read(
        "Listing responses",
        state.responses.list_for_event(&event_id).await,
    )?;
    Ok(Json(records.into_iter().map(ResponseView::from).collect()))
}

/// POST /api/events/:event_id/respond
pub async fn handle_respond(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<(StatusCode, Json<Ack>), AppError> {
    let event_id = validate_event_id(&event_id)?;
    let response_type = parse_response_type(req.response_type.as_deref())?;
    let participant_id = validate_participant_id(req.participant_id.as_deref())?;
    let timestamp = resolve_timestamp(req.timestamp.as_deref(), Utc::now())?;

    state
        .responses
        .upsert(&event_id, &participant_id, response_type, timestamp)
        .await?;

    Ok((StatusCode::CREATED, Json(Ack::ok("Response recorded"))))
}

/// DELETE /api/events/:event_id/responses/:participant_id
pub async fn handle_delete_response(
    State(state): State<AppState>,
    Path((event_id, participant_id)): Path<(String, String)>,
) -> Result<Json<Ack>, AppError> {
    let event_id = validate_event_id(&event_id)?;
    let participant_id = validate_participant_id(Some(&participant_id))?;

    let removed = state.responses.delete(&event_id, &participant_id).await?;
    let message = if removed {
        "Response removed"
    } else {
        "No response to remove"
    };
    Ok(Json(Ack::ok(message)))
}

/// GET /api/responses
pub async fn handle_list_all_responses(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Vec<ResponseView>>>, AppError> {
    let grouped = state.degrade_read(
        "Listing all responses",
        state.responses.list_grouped_by_event().await,
    )?;
    Ok(Json(
        grouped
            .into_iter()
            .map(|(event_id, records)| {
                (event_id, records.into_iter().map(ResponseView::from).collect())
            })
            .collect(),
    ))
}

/// GET /api/statistics
pub async fn handle_statistics(
    State(state): State<AppState>,
) -> Result<Json<Statistics>, AppError> {
    let stats = state.degrade_read("Computing statistics", state.responses.statistics().await)?;
    Ok(Json(stats))
}
