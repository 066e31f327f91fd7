use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub property_id: Uuid,
    pub from: String,
    pub to: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RangeHeldEvent {
    pub property_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub holder: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CalendarSyncedEvent {
    pub source_id: Uuid,
    pub property_id: Uuid,
    pub added: usize,
    pub updated: usize,
    pub cancelled: usize,
    pub occurred_at: DateTime<Utc>,
}
