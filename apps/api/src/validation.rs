//! Boundary validation for untrusted client input.
//!
//! `participantId` and `timestamp` come from anonymous browsers, so they are
//! normalised here before anything reaches a store.

use chrono::{DateTime, Duration, Utc};

use crate::errors::AppError;
use crate::responses::models::ResponseType;

pub const MAX_EVENT_ID_BYTES: usize = 256;
pub const MAX_PARTICIPANT_ID_BYTES: usize = 128;
pub const MAX_IMAGE_PATH_BYTES: usize = 2048;
pub const MAX_ADDITIONAL_INFO_BYTES: usize = 10_000;

/// Client clocks may run ahead by this much before the timestamp is clamped.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Trims and checks an identifier taken from the URL path or request body.
fn validate_identifier(field: &str, raw: Option<&str>, max_bytes: usize) -> Result<String, AppError> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.len() > max_bytes {
        tracing::warn!("{field} exceeds limit: {} bytes (max: {max_bytes})", value.len());
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_bytes} bytes"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(AppError::Validation(format!(
            "{field} must not contain control characters"
        )));
    }
    Ok(value.to_string())
}

pub fn validate_event_id(raw: &str) -> Result<String, AppError> {
    validate_identifier("eventId", Some(raw), MAX_EVENT_ID_BYTES)
}

pub fn validate_participant_id(raw: Option<&str>) -> Result<String, AppError> {
    validate_identifier("participantId", raw, MAX_PARTICIPANT_ID_BYTES)
}

/// Only `like` and `dislike` are accepted.
pub fn parse_response_type(raw: Option<&str>) -> Result<ResponseType, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("responseType is required".to_string()))?;
    raw.parse::<ResponseType>().map_err(AppError::Validation)
}

/// Parses a client-supplied RFC 3339 timestamp. Absent means `now`; a value
/// further in the future than the allowed skew is clamped to `now`.
pub fn resolve_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(now);
    };

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| AppError::Validation(format!("timestamp must be RFC 3339: {e}")))?
        .with_timezone(&Utc);

    if parsed > now + Duration::seconds(MAX_FUTURE_SKEW_SECS) {
        tracing::warn!("Clamping future timestamp {parsed} to {now}");
        return Ok(now);
    }
    Ok(parsed)
}

/// Checks the length of a free-text metadata field.
pub fn check_length(field: &str, value: &str, max_bytes: usize) -> Result<(), AppError> {
    if value.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_bytes} bytes"
        )));
    }
    Ok(())
}
