//! Raw segments to [`CalendarResponse`] conversion.
//!
//! Normalization is pure and deterministic: the same segments and target
//! month always produce the same response, byte for byte once serialized.
//!
//! The pipeline:
//! 1. Drops cancelled records and records starting outside the target month
//! 2. Deduplicates records seen in more than one segment by stable id
//! 3. Converts the rest to [`MonthEntry`] values
//! 4. Sorts chronologically in the month's timezone

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::trace;

use calscrape_core::{CalendarResponse, MonthEntry, TargetMonth};

use crate::raw_segment::{RawCalendarSegment, RawEventTime, RawRecord};

/// Normalizes the aggregated segments of one month into a success response.
pub fn normalize(segments: &[RawCalendarSegment], month: &TargetMonth) -> CalendarResponse {
    CalendarResponse::success(normalize_entries(segments, month))
}

/// Converts segments to sorted, deduplicated month entries.
pub fn normalize_entries(segments: &[RawCalendarSegment], month: &TargetMonth) -> Vec<MonthEntry> {
    let tz = month.timezone();
    let label = month.label();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for record in segments.iter().flat_map(|s| s.records.iter()) {
        if record.is_cancelled() {
            continue;
        }

        let start = record.start.to_event_time();
        let date = start.date_in(&tz);
        if !month.contains_date(date) {
            trace!(%date, month = %month, "dropping record outside target month");
            continue;
        }

        let id = stable_id(record);
        if !seen.insert(id.clone()) {
            continue;
        }

        let mut entry = MonthEntry::new(
            id,
            date,
            &label,
            record.effective_title(),
            start,
            record.end.to_event_time(),
        );
        if let Some(ref location) = record.location {
            entry = entry.with_location(location);
        }
        if let Some(ref description) = record.description {
            entry = entry.with_description(description);
        }
        if let Some(ref category) = record.category {
            entry = entry.with_category(category);
        }
        if let Some(ref url) = record.url {
            entry = entry.with_url(url);
        }
        entries.push(entry);
    }

    entries.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start.instant_in(&tz).cmp(&b.start.instant_in(&tz)))
            .then_with(|| a.end.instant_in(&tz).cmp(&b.end.instant_in(&tz)))
            .then_with(|| a.id.cmp(&b.id))
    });

    entries
}

/// Returns the upstream id, or a digest of title and times when the
/// upstream provides none.
pub fn stable_id(record: &RawRecord) -> String {
    if let Some(id) = record.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(record.effective_title().as_bytes());
    hasher.update([0u8]);
    hash_time(&mut hasher, &record.start);
    hash_time(&mut hasher, &record.end);
    let digest = hasher.finalize();

    format!("h-{:x}", digest)
}

fn hash_time(hasher: &mut Sha256, time: &RawEventTime) {
    match time {
        RawEventTime::DateTime(dt) => {
            hasher.update(b"dt");
            hasher.update(dt.timestamp().to_le_bytes());
        }
        RawEventTime::Date(date) => {
            hasher.update(b"d");
            hasher.update(date.to_string().as_bytes());
        }
    }
}
