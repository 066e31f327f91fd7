//! Per-source-type feed parsing into normalized busy intervals.
//!
//! Every source kind exposes the same capability: raw feed text in,
//! validated `FeedEvent`s out. Events missing a stable id or with a
//! non-positive date range are dropped individually so one malformed
//! entry never aborts a sync.

use chrono::NaiveDate;
use icalendar::parser::{read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use tracing::warn;
use veranda_shared::StayRange;

use crate::models::SourceKind;

/// One normalized busy interval from an external feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    /// Stable external id used for idempotent upsert across syncs.
    pub uid: String,
    pub range: StayRange,
    pub summary: Option<String>,
}

/// Parse result with the count of individually dropped events, so the
/// sync outcome can report them.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub events: Vec<FeedEvent>,
    pub dropped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed payload is not valid ICS: {0}")]
    Ics(String),

    #[error("Source kind has no feed: {0}")]
    NoFeed(&'static str),
}

impl SourceKind {
    /// The one shared parsing capability of the source-kind variant.
    pub fn parse_feed(&self, raw: &str) -> Result<ParsedFeed, FeedError> {
        match self {
            SourceKind::Airbnb => parse_platform_json(raw, "events", "uid", "start_date", "end_date"),
            SourceKind::Vrbo => {
                parse_platform_json(raw, "reservations", "reservationId", "arrival", "departure")
            }
            SourceKind::Ical => parse_ics(raw),
            SourceKind::Manual => Err(FeedError::NoFeed("manual blocks are host-entered")),
        }
    }
}

/// Validate one candidate event; `None` means it is dropped.
fn make_event(
    uid: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    summary: Option<String>,
) -> Option<FeedEvent> {
    let uid = uid.filter(|u| !u.is_empty())?;
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            warn!(uid = %uid, "Dropping feed event without parseable dates");
            return None;
        }
    };
    if end <= start {
        warn!(uid = %uid, %start, %end, "Dropping feed event with non-positive range");
        return None;
    }
    Some(FeedEvent {
        uid,
        range: StayRange::new(start, end),
        summary,
    })
}

/// Platform JSON feeds share one envelope shape: an array of event
/// objects under `list_key`, with per-platform field names.
fn parse_platform_json(
    raw: &str,
    list_key: &str,
    id_key: &str,
    start_key: &str,
    end_key: &str,
) -> Result<ParsedFeed, FeedError> {
    let document: serde_json::Value = serde_json::from_str(raw)?;
    let entries = document
        .get(list_key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut parsed = ParsedFeed::default();
    for entry in entries {
        let uid = entry.get(id_key).and_then(|v| v.as_str()).map(str::to_string);
        let start = entry
            .get(start_key)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<NaiveDate>().ok());
        let end = entry
            .get(end_key)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<NaiveDate>().ok());
        let summary = entry
            .get("summary")
            .or_else(|| entry.get("status"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        match make_event(uid, start, end, summary) {
            Some(event) => parsed.events.push(event),
            None => parsed.dropped += 1,
        }
    }
    Ok(parsed)
}

/// ICS feeds (the lowest common denominator exports) parsed with the
/// icalendar crate's parser.
fn parse_ics(raw: &str) -> Result<ParsedFeed, FeedError> {
    let unfolded = unfold(raw);
    let calendar = read_calendar(&unfolded).map_err(|e| FeedError::Ics(e.to_string()))?;

    // VEVENTs may sit at the top level or nested under VCALENDAR
    let mut vevents = Vec::new();
    for component in &calendar.components {
        if component.name == "VEVENT" {
            vevents.push(component);
        }
        for child in &component.components {
            if child.name == "VEVENT" {
                vevents.push(child);
            }
        }
    }

    let mut parsed = ParsedFeed::default();
    for vevent in vevents {
        let uid = vevent.find_prop("UID").map(|p| p.val.to_string());
        let start = vevent
            .find_prop("DTSTART")
            .and_then(|p| DatePerhapsTime::try_from(p).ok())
            .map(to_date);
        let end = vevent
            .find_prop("DTEND")
            .and_then(|p| DatePerhapsTime::try_from(p).ok())
            .map(to_date);
        let summary = vevent.find_prop("SUMMARY").map(|p| p.val.to_string());

        match make_event(uid, start, end, summary) {
            Some(event) => parsed.events.push(event),
            None => parsed.dropped += 1,
        }
    }
    Ok(parsed)
}

fn to_date(value: DatePerhapsTime) -> NaiveDate {
    match value {
        DatePerhapsTime::Date(date) => date,
        DatePerhapsTime::DateTime(dt) => match dt {
            CalendarDateTime::Floating(naive) => naive.date(),
            CalendarDateTime::Utc(utc) => utc.date_naive(),
            CalendarDateTime::WithTimezone { date_time, .. } => date_time.date(),
        },
    }
}
