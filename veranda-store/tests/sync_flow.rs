mod support;

use std::sync::atomic::Ordering;

use support::*;
use uuid::Uuid;
use veranda_calendar::{
    BlockRepository, BlockStatus, CalendarBlock, CalendarSource, DayStatus, RateAdjustment,
    RuleRepository, SeasonalRule, SourceKind, SourceRepository, SourceStatus,
};
use veranda_shared::StayRange;

const FEED_URL: &str = "https://feeds.test/calendar.json";

fn range(start: &str, end: &str) -> StayRange {
    StayRange::new(start.parse().unwrap(), end.parse().unwrap())
}

async fn seed_source(h: &Harness, property_id: Uuid, kind: SourceKind) -> CalendarSource {
    let source = CalendarSource::new(
        property_id,
        "External calendar".to_string(),
        kind,
        Some(FEED_URL.to_string()),
    );
    h.sources.insert(&source).await.unwrap();
    source
}

#[tokio::test]
async fn test_external_event_appears_then_vanishes() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Airbnb).await;

    h.fetcher
        .set_feed(
            FEED_URL,
            r#"{"events": [{"uid": "U1", "start_date": "2025-08-01", "end_date": "2025-08-03"}]}"#,
        )
        .await;

    let outcome = h.sync.sync_source(source.id).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.added, 1);

    let stay = range("2025-08-01", "2025-08-03");
    assert!(!h.reconciler.is_range_free(prop.id, stay, None).await.unwrap());

    // Next pull no longer lists U1: exactly one soft-cancel
    h.fetcher.set_feed(FEED_URL, r#"{"events": []}"#).await;
    let outcome = h.sync.sync_source(source.id).await.unwrap();
    assert_eq!(outcome.cancelled, 1);
    assert_eq!(outcome.added, 0);

    // Never hard-deleted; the dates report available again
    let blocks = h.blocks.all().await;
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].status, BlockStatus::Cancelled);
    assert!(h.reconciler.is_range_free(prop.id, stay, None).await.unwrap());
}

#[tokio::test]
async fn test_resync_unchanged_feed_is_a_noop() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Airbnb).await;

    h.fetcher
        .set_feed(
            FEED_URL,
            r#"{"events": [
                {"uid": "U1", "start_date": "2025-08-01", "end_date": "2025-08-03"},
                {"uid": "U2", "start_date": "2025-08-10", "end_date": "2025-08-14"}
            ]}"#,
        )
        .await;

    let first = h.sync.sync_source(source.id).await.unwrap();
    assert_eq!(first.added, 2);

    let second = h.sync.sync_source(source.id).await.unwrap();
    assert_eq!((second.added, second.updated, second.cancelled), (0, 0, 0));
    assert_eq!(h.blocks.all().await.len(), 2);
}

#[tokio::test]
async fn test_changed_event_updates_in_place() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Vrbo).await;

    h.fetcher
        .set_feed(
            FEED_URL,
            r#"{"reservations": [{"reservationId": "R1", "arrival": "2025-08-01", "departure": "2025-08-03"}]}"#,
        )
        .await;
    h.sync.sync_source(source.id).await.unwrap();

    // The guest extended their stay upstream
    h.fetcher
        .set_feed(
            FEED_URL,
            r#"{"reservations": [{"reservationId": "R1", "arrival": "2025-08-01", "departure": "2025-08-05"}]}"#,
        )
        .await;
    let outcome = h.sync.sync_source(source.id).await.unwrap();
    assert_eq!(outcome.updated, 1);

    let blocks = h.blocks.all().await;
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].range, range("2025-08-01", "2025-08-05"));
}

#[tokio::test]
async fn test_returning_event_reactivates_cancelled_block() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Airbnb).await;

    let with_u1 = r#"{"events": [{"uid": "U1", "start_date": "2025-08-01", "end_date": "2025-08-03"}]}"#;
    h.fetcher.set_feed(FEED_URL, with_u1).await;
    h.sync.sync_source(source.id).await.unwrap();

    h.fetcher.set_feed(FEED_URL, r#"{"events": []}"#).await;
    h.sync.sync_source(source.id).await.unwrap();

    // Late correction: U1 comes back
    h.fetcher.set_feed(FEED_URL, with_u1).await;
    let outcome = h.sync.sync_source(source.id).await.unwrap();
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.added, 0);

    let blocks = h.blocks.all().await;
    assert_eq!(blocks.len(), 1, "reappearing ids must not duplicate rows");
    assert_eq!(blocks[0].status, BlockStatus::Active);
}

#[tokio::test]
async fn test_malformed_events_dropped_individually() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Airbnb).await;

    h.fetcher
        .set_feed(
            FEED_URL,
            r#"{"events": [
                {"uid": "GOOD", "start_date": "2025-08-01", "end_date": "2025-08-03"},
                {"uid": "BAD", "start_date": "2025-08-09", "end_date": "2025-08-09"},
                {"start_date": "2025-08-11", "end_date": "2025-08-12"}
            ]}"#,
        )
        .await;

    let outcome = h.sync.sync_source(source.id).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(h.blocks.all().await.len(), 1);
}

#[tokio::test]
async fn test_source_disabled_after_five_failures() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Ical).await;
    h.fetcher.fail.store(true, Ordering::SeqCst);

    for attempt in 1..=5u32 {
        let outcome = h.sync.sync_source(source.id).await.unwrap();
        assert!(!outcome.is_success());
        let stored = h.sources.get(source.id).await.unwrap().unwrap();
        assert_eq!(stored.consecutive_failures, attempt);
    }

    let stored = h.sources.get(source.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SourceStatus::Disabled);
    assert!(stored.next_sync_at.is_none());
    assert!(stored.last_error.is_some());

    // The bulk driver no longer schedules it
    assert!(h.sync.sync_all_due().await.is_empty());

    // A manual retry after the remote recovers resurrects the source
    h.fetcher.fail.store(false, Ordering::SeqCst);
    h.fetcher.set_feed(
        FEED_URL,
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:ical-9\r\nDTSTART;VALUE=DATE:20250901\r\nDTEND;VALUE=DATE:20250903\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
    )
    .await;
    let outcome = h.sync.sync_source(source.id).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.added, 1);

    let stored = h.sources.get(source.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SourceStatus::Active);
    assert_eq!(stored.consecutive_failures, 0);
}

#[tokio::test]
async fn test_bulk_sync_isolates_bad_sources() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;

    let good = seed_source(&h, prop.id, SourceKind::Airbnb).await;
    // Points at a url the fetcher has no body for
    let bad = CalendarSource::new(
        prop.id,
        "Broken feed".to_string(),
        SourceKind::Ical,
        Some("https://feeds.test/missing.ics".to_string()),
    );
    h.sources.insert(&bad).await.unwrap();

    h.fetcher
        .set_feed(
            FEED_URL,
            r#"{"events": [{"uid": "U1", "start_date": "2025-08-01", "end_date": "2025-08-03"}]}"#,
        )
        .await;

    let outcomes = h.sync.sync_all_due().await;
    assert_eq!(outcomes.len(), 2);

    let good_outcome = outcomes.iter().find(|o| o.source_id == good.id).unwrap();
    let bad_outcome = outcomes.iter().find(|o| o.source_id == bad.id).unwrap();
    assert_eq!(good_outcome.added, 1);
    assert!(!bad_outcome.is_success());

    // The healthy source's blocks landed despite the neighbor failing
    assert_eq!(h.blocks.all().await.len(), 1);
}

#[tokio::test]
async fn test_manual_sources_refuse_to_sync() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;
    let source = seed_source(&h, prop.id, SourceKind::Manual).await;

    let err = h.sync.sync_source(source.id).await.unwrap_err();
    assert_eq!(err.code(), "validation_failed");
}

#[tokio::test]
async fn test_projection_merges_blocks_and_rules() {
    let h = harness();
    let prop = property(false);
    h.directory.insert(prop.clone()).await;

    // Manual block Aug 10-12, internal stay Aug 13-14
    let manual = CalendarBlock::manual(prop.id, range("2025-08-10", "2025-08-12"), None);
    let booking_block =
        CalendarBlock::for_booking(prop.id, Uuid::new_v4(), range("2025-08-13", "2025-08-14"), None);
    h.blocks.insert(&manual).await.unwrap();
    h.blocks.insert(&booking_block).await.unwrap();

    // August: +$50/night fixed, then +10%, and a 2-night minimum
    let fixed = SeasonalRule::new(
        prop.id,
        range("2025-08-01", "2025-09-01"),
        Some(RateAdjustment::Fixed(5_000)),
        Some(2),
    );
    let percent = SeasonalRule::new(
        prop.id,
        range("2025-08-01", "2025-09-01"),
        Some(RateAdjustment::Percentage(10.0)),
        None,
    );
    h.rules.insert(&fixed).await.unwrap();
    h.rules.insert(&percent).await.unwrap();

    let projection = h
        .reconciler
        .project(prop.id, range("2025-08-08", "2025-08-15"), None)
        .await
        .unwrap();

    assert_eq!(projection.summary.total_days, 7);
    assert_eq!(projection.summary.available_days, 4);
    assert_eq!(projection.summary.booked_days, 1);
    let expected_rate = 1.0 / 7.0;
    assert!((projection.summary.occupancy_rate - expected_rate).abs() < 1e-9);

    for day in &projection.days {
        // The availability identity: free iff nothing blocks the date
        let blocked = manual.blocks_date(day.date) || booking_block.blocks_date(day.date);
        assert_eq!(day.available, !blocked, "identity broken on {}", day.date);
        // (10000 + 5000) * 1.10, uniform across August
        assert_eq!(day.price, 16_500);
        assert_eq!(day.min_stay, 2);
    }

    let by_date = |d: &str| {
        projection
            .days
            .iter()
            .find(|day| day.date == d.parse().unwrap())
            .unwrap()
    };
    assert_eq!(by_date("2025-08-13").status, DayStatus::Booked);
    assert_eq!(by_date("2025-08-10").status, DayStatus::ManualBlock);

    // Check-out is allowed on the first blocked day (turnover) but not
    // while the previous night is taken
    assert!(by_date("2025-08-10").check_out_allowed);
    assert!(!by_date("2025-08-11").check_out_allowed);
    assert!(!by_date("2025-08-12").check_out_allowed);
    assert!(by_date("2025-08-13").check_out_allowed);
    assert!(!by_date("2025-08-14").check_out_allowed);
    assert!(!by_date("2025-08-10").check_in_allowed);
    assert!(by_date("2025-08-12").check_in_allowed);
}
