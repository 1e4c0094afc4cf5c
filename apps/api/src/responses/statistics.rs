use std::collections::BTreeMap;

use serde::Serialize;

use crate::responses::models::{ResponseRecord, ResponseType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatistics {
    pub likes: u64,
    pub dislikes: u64,
    pub total_responses: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsTotals {
    pub likes: u64,
    pub dislikes: u64,
    pub total_responses: u64,
    pub event_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub events: BTreeMap<String, EventStatistics>,
    pub totals: StatisticsTotals,
}

/// Counts likes and dislikes per event and overall.
///
/// An event only appears in `events` once it has at least one response;
/// `totals.event_count` counts exactly those events.
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a ResponseRecord>) -> Statistics {
    let mut events: BTreeMap<String, EventStatistics> = BTreeMap::new();

    for record in records {
        let entry = events.entry(record.event_id.clone()).or_default();
        match record.response_type {
            ResponseType::Like => entry.likes += 1,
            ResponseType::Dislike => entry.dislikes += 1,
        }
        entry.total_responses = entry.likes + entry.dislikes;
    }

    let mut totals = StatisticsTotals {
        event_count: events.len() as u64,
        ..Default::default()
    };
    for stats in events.values() {
        totals.likes += stats.likes;
        totals.dislikes += stats.dislikes;
        totals.total_responses += stats.total_responses;
    }

    Statistics { events, totals }
}
