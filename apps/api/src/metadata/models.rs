use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;
use crate::metadata::images::is_known_category;
use crate::validation::{check_length, MAX_ADDITIONAL_INFO_BYTES, MAX_IMAGE_PATH_BYTES};

/// Intent for one optional field in a partial update.
///
/// In JSON: an absent key is `Unset`, `null` is `Clear`, a value is `Set`.
/// Fields using it need `#[serde(default)]` so that absence maps to `Unset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Unset,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Unset
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => FieldUpdate::Clear,
            Some(value) => FieldUpdate::Set(value),
        })
    }
}

impl<T> FieldUpdate<T> {
    /// Resolves the new stored value given the current one.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            FieldUpdate::Unset => current,
            FieldUpdate::Clear => None,
            FieldUpdate::Set(value) => Some(value),
        }
    }
}

impl FieldUpdate<String> {
    /// Trims a `Set` value; an empty string means `Clear`.
    fn normalized(self) -> Self {
        match self {
            FieldUpdate::Set(v) if v.trim().is_empty() => FieldUpdate::Clear,
            FieldUpdate::Set(v) => FieldUpdate::Set(v.trim().to_string()),
            other => other,
        }
    }
}

/// Body of `POST /events/:event_id/metadata`. Keys other than the three
/// below (e.g. a `lastUpdated` echoed back by a client) are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default)]
    pub image_path: FieldUpdate<String>,
    #[serde(default)]
    pub image_category: FieldUpdate<String>,
    #[serde(default)]
    pub additional_info: FieldUpdate<String>,
}

impl MetadataPatch {
    /// Normalises and checks every `Set` value. Categories are lowercased
    /// and must be one of the known default-image categories.
    pub fn validated(self) -> Result<Self, AppError> {
        let image_path = self.image_path.normalized();
        if let FieldUpdate::Set(path) = &image_path {
            check_length("imagePath", path, MAX_IMAGE_PATH_BYTES)?;
        }

        let image_category = match self.image_category.normalized() {
            FieldUpdate::Set(c) => {
                let c = c.to_lowercase();
                if !is_known_category(&c) {
                    return Err(AppError::Validation(format!(
                        "imageCategory '{c}' is not a known category"
                    )));
                }
                FieldUpdate::Set(c)
            }
            other => other,
        };

        let additional_info = self.additional_info.normalized();
        if let FieldUpdate::Set(info) = &additional_info {
            check_length("additionalInfo", info, MAX_ADDITIONAL_INFO_BYTES)?;
        }

        Ok(Self {
            image_path,
            image_category,
            additional_info,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.image_path == FieldUpdate::Unset
            && self.image_category == FieldUpdate::Unset
            && self.additional_info == FieldUpdate::Unset
    }
}

/// Supplementary data kept per event. The event id is the storage key and
/// is not repeated inside the record. A missing record reads as the
/// default value, which serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MetadataRecord {
    /// Field-by-field merge: untouched fields keep their value, cleared
    /// fields become `None`. `last_updated` is always stamped.
    pub fn merge(self, patch: MetadataPatch, now: DateTime<Utc>) -> Self {
        Self {
            image_path: patch.image_path.apply(self.image_path),
            image_category: patch.image_category.apply(self.image_category),
            additional_info: patch.additional_info.apply(self.additional_info),
            last_updated: Some(now),
        }
    }
}
