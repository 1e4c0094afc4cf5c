//! Display-image resolution for an event.
//!
//! Precedence: explicit `imagePath`, then the stored category's default,
//! then a `[CATEGORY: x]` tag in the event description, then a location
//! match, then a fixed fallback. Never fails and never touches storage.

use std::sync::LazyLock;

use regex::Regex;

use crate::events::Event;
use crate::metadata::models::MetadataRecord;

pub const FALLBACK_IMAGE: &str = "/images/events/default.jpg";

const CATEGORY_IMAGES: &[(&str, &str)] = &[
    ("bingo", "/images/categories/bingo.jpg"),
    ("music", "/images/categories/music.jpg"),
    ("dance", "/images/categories/dance.jpg"),
    ("crafts", "/images/categories/crafts.jpg"),
    ("excursion", "/images/categories/excursion.jpg"),
    ("cinema", "/images/categories/cinema.jpg"),
    ("talk", "/images/categories/talk.jpg"),
    ("exercise", "/images/categories/exercise.jpg"),
    ("cooking", "/images/categories/cooking.jpg"),
    ("games", "/images/categories/games.jpg"),
];

/// Matched as case-insensitive substrings of the event location, in order.
const LOCATION_IMAGES: &[(&str, &str)] = &[
    ("biblioteca", "/images/locations/library.jpg"),
    ("library", "/images/locations/library.jpg"),
    ("parque", "/images/locations/park.jpg"),
    ("park", "/images/locations/park.jpg"),
    ("centro cívico", "/images/locations/community-centre.jpg"),
    ("centro civico", "/images/locations/community-centre.jpg"),
    ("community cent", "/images/locations/community-centre.jpg"),
    ("polideportivo", "/images/locations/sports-centre.jpg"),
    ("auditorio", "/images/locations/auditorium.jpg"),
];

static CATEGORY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*(?:category|categor[ií]a)\s*:\s*([^\]]+?)\s*\]")
        .expect("category tag pattern is valid")
});

pub fn is_known_category(category: &str) -> bool {
    category_image(category).is_some()
}

pub fn category_image(category: &str) -> Option<&'static str> {
    let category = category.trim().to_lowercase();
    CATEGORY_IMAGES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, image)| *image)
}

/// Extracts the category named by a `[CATEGORY: x]` tag, if any.
pub fn category_tag(description: &str) -> Option<String> {
    CATEGORY_TAG
        .captures(description)
        .map(|c| c[1].trim().to_lowercase())
        .filter(|c| !c.is_empty())
}

pub fn location_image(location: &str) -> Option<&'static str> {
    let location = location.to_lowercase();
    LOCATION_IMAGES
        .iter()
        .find(|(needle, _)| location.contains(needle))
        .map(|(_, image)| *image)
}

pub fn resolve_image(event: Option<&Event>, metadata: &MetadataRecord) -> String {
    if let Some(path) = metadata.image_path.as_deref().filter(|p| !p.trim().is_empty()) {
        return path.to_string();
    }

    if let Some(image) = metadata.image_category.as_deref().and_then(category_image) {
        return image.to_string();
    }

    if let Some(event) = event {
        if let Some(image) = category_tag(&event.description)
            .as_deref()
            .and_then(category_image)
        {
            return image.to_string();
        }
        if let Some(image) = location_image(&event.location) {
            return image.to_string();
        }
    }

    FALLBACK_IMAGE.to_string()
}
