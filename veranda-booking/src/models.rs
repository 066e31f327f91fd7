use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veranda_core::PropertyInfo;
use veranda_shared::{CancellationPolicy, GuestCount, StayRange};

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Declined,
    CheckedIn,
    CheckedOut,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// The allowed-edges table. Everything not listed here is an
    /// invalid transition.
    pub fn allowed_targets(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Pending => &[Confirmed, Declined, Cancelled],
            Confirmed => &[CheckedIn, Cancelled],
            CheckedIn => &[CheckedOut, Cancelled],
            CheckedOut => &[Completed],
            Declined | Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Statuses whose stay occupies calendar dates.
    pub fn occupies_calendar(&self) -> bool {
        use BookingStatus::*;
        matches!(self, Confirmed | CheckedIn | CheckedOut)
    }

    pub fn as_str(&self) -> &'static str {
        use BookingStatus::*;
        match self {
            Pending => "PENDING",
            Confirmed => "CONFIRMED",
            Declined => "DECLINED",
            CheckedIn => "CHECKED_IN",
            CheckedOut => "CHECKED_OUT",
            Completed => "COMPLETED",
            Cancelled => "CANCELLED",
        }
    }

    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Declined,
        BookingStatus::CheckedIn,
        BookingStatus::CheckedOut,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price breakdown frozen at creation (and re-frozen on an approved
/// modification). All amounts in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingSnapshot {
    pub nightly_subtotal: i64,
    pub cleaning_fee: i64,
    pub extra_guest_fee: i64,
    pub pet_fee: i64,
    pub service_fee: i64,
    pub taxes: i64,
    /// Flat fees from approved modifications, accumulated.
    #[serde(default)]
    pub modification_fees: i64,
    pub total: i64,
    pub nights: i64,
    pub currency: String,
}

/// The single source of truth for one stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub stay: StayRange,
    pub guests: GuestCount,
    pub status: BookingStatus,
    pub pricing: PricingSnapshot,
    pub policy: CancellationPolicy,
    /// Only set while host approval is pending.
    pub host_response_deadline: Option<DateTime<Utc>>,
    pub cancellation_deadline: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why the booking was declined or cancelled.
    pub status_reason: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        property: &PropertyInfo,
        guest_id: Uuid,
        stay: StayRange,
        guests: GuestCount,
        pricing: PricingSnapshot,
        status: BookingStatus,
        rules: &BookingRules,
    ) -> Self {
        let now = Utc::now();
        let mut booking = Self {
            id: Uuid::new_v4(),
            booking_number: String::new(),
            property_id: property.id,
            guest_id,
            host_id: property.host_id,
            stay,
            guests,
            status: BookingStatus::Pending,
            pricing,
            policy: property.cancellation_policy.clone(),
            host_response_deadline: None,
            cancellation_deadline: Some(Self::cancellation_deadline_for(&stay)),
            confirmed_at: None,
            declined_at: None,
            checked_in_at: None,
            checked_out_at: None,
            completed_at: None,
            cancelled_at: None,
            status_reason: None,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        booking.booking_number = Self::make_number(&booking.id, now);
        match status {
            BookingStatus::Confirmed => booking.apply_status(BookingStatus::Confirmed, now),
            _ => {
                booking.host_response_deadline = Some(now + Duration::hours(rules.host_response_hours));
            }
        }
        booking
    }

    /// Guest cancellation closes at the start of the check-in day.
    pub fn cancellation_deadline_for(stay: &StayRange) -> DateTime<Utc> {
        stay.check_in.and_time(NaiveTime::MIN).and_utc()
    }

    /// Format: VRD-{timestamp}-{short_id}
    fn make_number(id: &Uuid, now: DateTime<Utc>) -> String {
        let short_id = &id.to_string()[..8];
        format!("VRD-{}-{}", now.timestamp(), short_id.to_uppercase())
    }

    /// The stable reference the booking's internal calendar block
    /// carries, used to exclude its own occupancy in re-validation.
    pub fn occupancy_ref(&self) -> String {
        self.id.to_string()
    }

    /// Move to a new status and stamp the matching timestamp. Edge
    /// legality is the caller's job; this only records the move.
    pub fn apply_status(&mut self, new_status: BookingStatus, now: DateTime<Utc>) {
        self.status = new_status;
        self.updated_at = now;
        match new_status {
            BookingStatus::Confirmed => {
                self.confirmed_at = Some(now);
                self.host_response_deadline = None;
            }
            BookingStatus::Declined => self.declined_at = Some(now),
            BookingStatus::CheckedIn => self.checked_in_at = Some(now),
            BookingStatus::CheckedOut => self.checked_out_at = Some(now),
            BookingStatus::Completed => self.completed_at = Some(now),
            BookingStatus::Cancelled => self.cancelled_at = Some(now),
            BookingStatus::Pending => {}
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Guest,
    Host,
    System,
}

/// Who is asking for an operation. Sweepers act as `System`.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn guest(id: Uuid) -> Self {
        Self { id, role: ActorRole::Guest }
    }

    pub fn host(id: Uuid) -> Self {
        Self { id, role: ActorRole::Host }
    }

    pub fn system() -> Self {
        Self { id: Uuid::nil(), role: ActorRole::System }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub property_id: Uuid,
    pub stay: StayRange,
    pub guests: GuestCount,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancellationRequest {
    pub reason: Option<String>,
}

/// The change a guest asks for; the original side of the snapshot is
/// filled in from the booking by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestedChange {
    Dates(StayRange),
    Guests(GuestCount),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModificationRequest {
    pub change: RequestedChange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// Original/requested snapshots of a proposed change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum ModificationChange {
    Dates { from: StayRange, to: StayRange },
    Guests { from: GuestCount, to: GuestCount },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingModification {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub change: ModificationChange,
    /// New total minus old total, excluding the flat fee.
    pub price_delta: i64,
    pub modification_fee: i64,
    pub status: ModificationStatus,
    pub expires_at: DateTime<Utc>,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl BookingModification {
    pub fn new(
        booking_id: Uuid,
        change: ModificationChange,
        price_delta: i64,
        modification_fee: i64,
        requested_by: Uuid,
        approval_window: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            change,
            price_delta,
            modification_fee,
            status: ModificationStatus::Pending,
            expires_at: now + approval_window,
            requested_by,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ModificationStatus::Pending
    }

    pub fn resolve(&mut self, status: ModificationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.resolved_at = Some(now);
    }
}

/// Tunable booking workflow rules, loadable from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRules {
    #[serde(default = "default_lock_ttl_minutes")]
    pub lock_ttl_minutes: i64,
    #[serde(default = "default_host_response_hours")]
    pub host_response_hours: i64,
    /// No modifications inside this window before check-in.
    #[serde(default = "default_modification_cutoff_hours")]
    pub modification_cutoff_hours: i64,
    /// How long the host has to approve a modification.
    #[serde(default = "default_modification_window_hours")]
    pub modification_window_hours: i64,
    #[serde(default = "default_modification_fee")]
    pub modification_fee: i64,
    #[serde(default = "default_max_stay_nights")]
    pub max_stay_nights: i64,
    #[serde(default = "default_reminder_lead_days")]
    pub reminder_lead_days: i64,
}

fn default_lock_ttl_minutes() -> i64 {
    30
}
fn default_host_response_hours() -> i64 {
    24
}
fn default_modification_cutoff_hours() -> i64 {
    48
}
fn default_modification_window_hours() -> i64 {
    24
}
fn default_modification_fee() -> i64 {
    2_500
}
fn default_max_stay_nights() -> i64 {
    90
}
fn default_reminder_lead_days() -> i64 {
    1
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            lock_ttl_minutes: default_lock_ttl_minutes(),
            host_response_hours: default_host_response_hours(),
            modification_cutoff_hours: default_modification_cutoff_hours(),
            modification_window_hours: default_modification_window_hours(),
            modification_fee: default_modification_fee(),
            max_stay_nights: default_max_stay_nights(),
            reminder_lead_days: default_reminder_lead_days(),
        }
    }
}
