use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Like,
    Dislike,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Like => "like",
            ResponseType::Dislike => "dislike",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ResponseType::Like),
            "dislike" => Ok(ResponseType::Dislike),
            other => Err(format!(
                "responseType must be 'like' or 'dislike', got '{other}'"
            )),
        }
    }
}

/// One participant's reaction to one event. Stored under `id`, which is
/// derived from the (event, participant) pair, so a pair never has two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub id: String,
    pub event_id: String,
    pub participant_id: String,
    pub response_type: ResponseType,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn new(
        event_id: &str,
        participant_id: &str,
        response_type: ResponseType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: composite_id(event_id, participant_id),
            event_id: event_id.to_string(),
            participant_id: participant_id.to_string(),
            response_type,
            timestamp,
        }
    }
}

pub fn composite_id(event_id: &str, participant_id: &str) -> String {
    format!("{event_id}_{participant_id}")
}

/// Wire shape of a response as listed under its event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseView {
    pub id: String,
    pub participant_id: String,
    pub response_type: ResponseType,
    pub timestamp: DateTime<Utc>,
}

impl From<ResponseRecord> for ResponseView {
    fn from(r: ResponseRecord) -> Self {
        Self {
            id: r.id,
            participant_id: r.participant_id,
            response_type: r.response_type,
            timestamp: r.timestamp,
        }
    }
}

/// Body of `POST /events/:event_id/respond`. Fields stay loosely typed so
/// that missing or malformed values surface as validation errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub response_type: Option<String>,
    #[serde(alias = "userId")]
    pub participant_id: Option<String>,
    pub timestamp: Option<String>,
}
