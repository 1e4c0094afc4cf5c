//! One-shot import of the legacy flat files into the configured backend.
//!
//! Legacy layout under `DATA_DIR`:
//! - `event_responses.json`: `{ eventId: [{ id, userId, responseType, timestamp }] }`
//! - `event_metadata.json`:  `{ eventId: { imagePath, imageCategory, additionalInfo, lastUpdated } }`
//!
//! Entries go through the normal stores, so ids are re-derived and the
//! usual validation applies. Invalid entries are skipped, not fatal.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::metadata::images::is_known_category;
use crate::metadata::models::{FieldUpdate, MetadataPatch};
use crate::metadata::store::MetadataStore;
use crate::responses::store::ResponseStore;
use crate::validation::{
    parse_response_type, resolve_timestamp, validate_event_id, validate_participant_id,
};

pub const LEGACY_RESPONSES_FILE: &str = "event_responses.json";
pub const LEGACY_METADATA_FILE: &str = "event_metadata.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyResponse {
    #[serde(alias = "participantId")]
    user_id: Option<String>,
    response_type: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMetadata {
    image_path: Option<String>,
    image_category: Option<String>,
    additional_info: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub responses_imported: usize,
    pub responses_skipped: usize,
    pub metadata_imported: usize,
    pub metadata_skipped: usize,
}

pub async fn import_legacy(
    data_dir: &Path,
    responses: &ResponseStore,
    metadata: &MetadataStore,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    info!("Migrating event responses...");
    let legacy: BTreeMap<String, Vec<LegacyResponse>> =
        read_legacy(&data_dir.join(LEGACY_RESPONSES_FILE)).await?;
    let now = Utc::now();
    for (event_id, entries) in legacy {
        for entry in entries {
            let parsed = validate_event_id(&event_id).and_then(|event_id| {
                Ok((
                    event_id,
                    validate_participant_id(entry.user_id.as_deref())?,
                    parse_response_type(entry.response_type.as_deref())?,
                    resolve_timestamp(entry.timestamp.as_deref(), now)?,
                ))
            });
            match parsed {
                Ok((event_id, participant_id, response_type, timestamp)) => {
                    responses
                        .upsert(&event_id, &participant_id, response_type, timestamp)
                        .await
                        .context("writing migrated response")?;
                    report.responses_imported += 1;
                }
                Err(e) => {
                    warn!("Skipping legacy response on event {event_id}: {e}");
                    report.responses_skipped += 1;
                }
            }
        }
    }
    info!(
        "Migrated {} event responses ({} skipped)",
        report.responses_imported, report.responses_skipped
    );

    info!("Migrating event metadata...");
    let legacy: BTreeMap<String, LegacyMetadata> =
        read_legacy(&data_dir.join(LEGACY_METADATA_FILE)).await?;
    for (event_id, entry) in legacy {
        let patch = legacy_patch(&event_id, entry);
        match validate_event_id(&event_id).and_then(|id| Ok((id, patch.validated()?))) {
            Ok((event_id, patch)) => {
                metadata
                    .upsert(&event_id, patch)
                    .await
                    .context("writing migrated metadata")?;
                report.metadata_imported += 1;
            }
            Err(e) => {
                warn!("Skipping legacy metadata for event {event_id}: {e}");
                report.metadata_skipped += 1;
            }
        }
    }
    info!(
        "Migrated {} metadata entries ({} skipped)",
        report.metadata_imported, report.metadata_skipped
    );

    Ok(report)
}

/// Legacy nulls never clear anything: absent and null both mean "keep".
/// Categories that are no longer known are dropped rather than failing the
/// whole entry.
fn legacy_patch(event_id: &str, entry: LegacyMetadata) -> MetadataPatch {
    let set = |v: Option<String>| v.map_or(FieldUpdate::Unset, FieldUpdate::Set);
    let image_category = match entry.image_category {
        Some(c) if !c.trim().is_empty() && !is_known_category(&c) => {
            warn!("Dropping unknown category '{c}' for event {event_id}");
            FieldUpdate::Unset
        }
        other => set(other),
    };
    MetadataPatch {
        image_path: set(entry.image_path),
        image_category,
        additional_info: set(entry.additional_info),
    }
}

/// A missing legacy file is treated as empty.
async fn read_legacy<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("{} is not valid legacy JSON", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found, nothing to migrate", path.display());
            Ok(T::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}
