use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veranda_shared::StayRange;

/// A source is disabled after this many consecutive sync failures.
/// Manual retry is still honored and resets the breaker on success.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// External calendar platforms we ingest, plus host-entered manual
/// blocks. One shared parsing capability per kind lives in `feed.rs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Airbnb,
    Vrbo,
    Ical,
    Manual,
}

impl SourceKind {
    /// How often this kind of source is pulled. Manual blocks are
    /// host-entered and never auto-sync.
    pub fn cadence(&self) -> Option<Duration> {
        match self {
            SourceKind::Airbnb => Some(Duration::hours(1)),
            SourceKind::Vrbo => Some(Duration::hours(2)),
            SourceKind::Ical => Some(Duration::hours(6)),
            SourceKind::Manual => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Active,
    Error,
    Disabled,
}

/// Per-property external feed configuration and sync health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSource {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    pub url: Option<String>,
    /// Reserved for pushing internal stays outward. No push leg is
    /// implemented; the flag is carried so one can be added behind the
    /// same adapter interface.
    pub two_way: bool,
    pub status: SourceStatus,
    pub consecutive_failures: u32,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CalendarSource {
    pub fn new(property_id: Uuid, name: String, kind: SourceKind, url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_id,
            name,
            kind,
            url,
            two_way: false,
            status: SourceStatus::Active,
            consecutive_failures: 0,
            last_sync_at: None,
            // Due immediately; cadence applies after the first pull
            next_sync_at: kind.cadence().map(|_| now),
            last_error: None,
            created_at: now,
        }
    }

    /// Eligible for the bulk driver: active, auto-syncing, and past its
    /// scheduled time. Disabled sources are skipped here but a direct
    /// `sync_source` call still works as a manual retry.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status != SourceStatus::Disabled
            && self.kind.cadence().is_some()
            && self.next_sync_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.status = SourceStatus::Active;
        self.last_error = None;
        self.last_sync_at = Some(now);
        self.next_sync_at = self.kind.cadence().map(|c| now + c);
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>, error: &str) {
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            self.status = SourceStatus::Disabled;
            // Auto-scheduling stops; only a manual retry can resurrect
            self.next_sync_at = None;
        } else {
            self.status = SourceStatus::Error;
            self.next_sync_at = self.kind.cadence().map(|c| now + c);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
    /// An internal confirmed stay occupying the dates.
    Booking,
    /// Imported from an external platform calendar.
    External,
    /// Host-entered block.
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Active,
    Cancelled,
}

/// A busy interval on a property calendar. Blocks are soft-cancelled,
/// never deleted, so late-arriving feed corrections keep their audit
/// trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarBlock {
    pub id: Uuid,
    pub property_id: Uuid,
    pub kind: BlockKind,
    pub source_id: Option<Uuid>,
    /// Stable identity for idempotent upsert: the feed event uid for
    /// external blocks, the booking id for internal ones.
    pub external_ref: Option<String>,
    pub range: StayRange,
    pub summary: Option<String>,
    pub status: BlockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl CalendarBlock {
    pub fn external(
        property_id: Uuid,
        source_id: Uuid,
        external_ref: String,
        range: StayRange,
        summary: Option<String>,
    ) -> Self {
        Self::build(property_id, BlockKind::External, Some(source_id), Some(external_ref), range, summary)
    }

    pub fn manual(property_id: Uuid, range: StayRange, summary: Option<String>) -> Self {
        Self::build(property_id, BlockKind::Manual, None, None, range, summary)
    }

    pub fn for_booking(property_id: Uuid, booking_id: Uuid, range: StayRange, summary: Option<String>) -> Self {
        Self::build(
            property_id,
            BlockKind::Booking,
            None,
            Some(booking_id.to_string()),
            range,
            summary,
        )
    }

    fn build(
        property_id: Uuid,
        kind: BlockKind,
        source_id: Option<Uuid>,
        external_ref: Option<String>,
        range: StayRange,
        summary: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_id,
            kind,
            source_id,
            external_ref,
            range,
            summary,
            status: BlockStatus::Active,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BlockStatus::Active
    }

    /// Soft-cancel. The row stays behind for the audit trail.
    pub fn cancel(&mut self) {
        let now = Utc::now();
        self.status = BlockStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
    }

    /// A previously-cancelled external id reappearing in the feed.
    pub fn reactivate(&mut self, range: StayRange, summary: Option<String>) {
        self.status = BlockStatus::Active;
        self.cancelled_at = None;
        self.range = range;
        self.summary = summary;
        self.updated_at = Utc::now();
    }

    pub fn reschedule(&mut self, range: StayRange, summary: Option<String>) {
        self.range = range;
        self.summary = summary;
        self.updated_at = Utc::now();
    }

    pub fn blocks_date(&self, date: NaiveDate) -> bool {
        self.is_active() && self.range.contains(date)
    }
}

/// Seasonal price or minimum-stay adjustment over a half-open date
/// interval. Rules overlay the calendar but never block occupancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalRule {
    pub id: Uuid,
    pub property_id: Uuid,
    pub range: StayRange,
    pub adjustment: Option<RateAdjustment>,
    pub min_stay: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type", content = "value")]
pub enum RateAdjustment {
    /// Added to the nightly base price, in minor units.
    Fixed(i64),
    /// Applied multiplicatively, e.g. 15.0 means +15%.
    Percentage(f64),
}

impl SeasonalRule {
    pub fn new(
        property_id: Uuid,
        range: StayRange,
        adjustment: Option<RateAdjustment>,
        min_stay: Option<u32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            range,
            adjustment,
            min_stay,
            created_at: Utc::now(),
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.range.contains(date)
    }
}
