//! Shared wiring for the integration suites: every repository and
//! collaborator is in-memory, so flows run end to end without any
//! external service.
#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{Duration, Utc};
use uuid::Uuid;
use veranda_booking::{
    AvailabilityLockManager, BookingRules, BookingService, PricingSnapshot,
};
use veranda_calendar::{Reconciler, SyncEngine};
use veranda_core::PropertyInfo;
use veranda_shared::{CancellationPolicy, GuestCount, StayRange};
use veranda_store::{
    InMemoryBlockRepository, InMemoryBookingRepository, InMemoryModificationRepository,
    InMemoryRuleRepository, InMemorySourceRepository, MockPaymentGateway, RecordingNotifier,
    StaticFeedFetcher, StaticPropertyDirectory,
};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub struct Harness {
    pub service: Arc<BookingService>,
    pub sync: Arc<SyncEngine>,
    pub reconciler: Arc<Reconciler>,
    pub locks: Arc<AvailabilityLockManager>,
    pub bookings: Arc<InMemoryBookingRepository>,
    pub modifications: Arc<InMemoryModificationRepository>,
    pub blocks: Arc<InMemoryBlockRepository>,
    pub sources: Arc<InMemorySourceRepository>,
    pub rules: Arc<InMemoryRuleRepository>,
    pub directory: Arc<StaticPropertyDirectory>,
    pub payments: Arc<MockPaymentGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub fetcher: Arc<StaticFeedFetcher>,
}

pub fn harness() -> Harness {
    init_tracing();

    let bookings = Arc::new(InMemoryBookingRepository::new());
    let modifications = Arc::new(InMemoryModificationRepository::new());
    let blocks = Arc::new(InMemoryBlockRepository::new());
    let sources = Arc::new(InMemorySourceRepository::new());
    let rules = Arc::new(InMemoryRuleRepository::new());
    let directory = Arc::new(StaticPropertyDirectory::new());
    let payments = Arc::new(MockPaymentGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let fetcher = Arc::new(StaticFeedFetcher::new());

    let reconciler = Arc::new(Reconciler::new(
        blocks.clone(),
        rules.clone(),
        directory.clone(),
    ));
    let booking_rules = BookingRules::default();
    let locks = Arc::new(AvailabilityLockManager::new(
        reconciler.clone(),
        Duration::minutes(booking_rules.lock_ttl_minutes),
    ));
    let service = Arc::new(BookingService::new(
        bookings.clone(),
        modifications.clone(),
        blocks.clone(),
        reconciler.clone(),
        locks.clone(),
        directory.clone(),
        payments.clone(),
        notifier.clone(),
        booking_rules,
    ));
    let sync = Arc::new(SyncEngine::new(
        sources.clone(),
        blocks.clone(),
        fetcher.clone(),
    ));

    Harness {
        service,
        sync,
        reconciler,
        locks,
        bookings,
        modifications,
        blocks,
        sources,
        rules,
        directory,
        payments,
        notifier,
        fetcher,
    }
}

/// $100/night, $40 cleaning, free cancellation until 14 days out,
/// 50% back until 5 days out.
pub fn property(instant_book: bool) -> PropertyInfo {
    PropertyInfo {
        id: Uuid::new_v4(),
        host_id: Uuid::new_v4(),
        base_price: 10_000,
        cleaning_fee: 4_000,
        extra_guest_fee: 1_500,
        pet_fee: 3_000,
        included_guests: 2,
        max_guests: 6,
        pets_allowed: true,
        service_fee_percent: 12.0,
        tax_percent: 8.0,
        instant_book,
        cancellation_policy: CancellationPolicy {
            free_cancellation_days: 14,
            partial_refund_days: 5,
            partial_refund_percentage: 50,
            service_fee_refundable: false,
        },
        currency: "USD".to_string(),
    }
}

pub fn stay_from(days_out: i64, nights: i64) -> StayRange {
    let check_in = Utc::now().date_naive() + Duration::days(days_out);
    StayRange::new(check_in, check_in + Duration::days(nights))
}

pub fn party(adults: u32) -> GuestCount {
    GuestCount {
        adults,
        children: 0,
        infants: 0,
        pets: 0,
    }
}

pub fn pricing(nightly_subtotal: i64, nights: i64) -> PricingSnapshot {
    PricingSnapshot {
        nightly_subtotal,
        cleaning_fee: 4_000,
        extra_guest_fee: 0,
        pet_fee: 0,
        service_fee: 0,
        taxes: 0,
        modification_fees: 0,
        total: nightly_subtotal + 4_000,
        nights,
        currency: "USD".to_string(),
    }
}
