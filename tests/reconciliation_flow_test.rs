mod common;

use common::{date, seed_slot, seed_stand, seed_week, setup_pool, time};

use krutilka::db::models::NewActivityRecord;
use krutilka::db::{
    ActivityRepository, AssignmentRepository, ReservationRepository,
    WorkoutNotificationRepository,
};
use krutilka::services::localtime;
use krutilka::services::matcher::{self, MatchedBy};

/// Account "alice" watches stand 5; client 42 is booked 10:00–12:00 on
/// 2024-03-01; an anonymous activity starts at 10:05 local. The matcher
/// attributes it to client 42, the ledger records it, and a second poll of
/// the same feed is a no-op.
#[tokio::test]
async fn activity_is_attributed_recorded_and_deduped() {
    let pool = setup_pool().await;
    seed_stand(&pool, 5).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (slot, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;

    let reservation = ReservationRepository::list_for_slot(&pool, &slot.id)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    ReservationRepository::book_available(&pool, &reservation.id, 42, "Анна Кузнецова", None, None)
        .await
        .unwrap()
        .unwrap();

    // startTime "2024-03-01T07:05:00Z" in Europe/Moscow is 10:05 local.
    let started_utc = chrono::DateTime::parse_from_rfc3339("2024-03-01T07:05:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let started_local = localtime::utc_to_local(started_utc, 3);
    assert_eq!(started_local, date(2024, 3, 1).and_hms_opt(10, 5, 0).unwrap());

    // First poll: unseen, matched on the account's stand, recorded.
    assert!(!ActivityRepository::was_seen(&pool, "alice", "act-1").await.unwrap());

    let candidates = ReservationRepository::booked_on_date(&pool, started_local.date())
        .await
        .unwrap();
    let matched = matcher::match_activity(&candidates, &[5], started_local, None, 30).unwrap();
    assert_eq!(matched.matched_by, MatchedBy::Stand);
    assert_eq!(matched.reservation.client_id, Some(42));

    let first = ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            account_id: "alice".to_string(),
            activity_id: "act-1".to_string(),
            client_id: matched.reservation.client_id,
            scheduled_name: matched.reservation.client_name.clone(),
            start_time: Some(started_local),
            sent_clientbot: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(first);

    // Second poll of the same feed: the ledger short-circuits processing and
    // a re-record with all-false flags changes nothing.
    assert!(ActivityRepository::was_seen(&pool, "alice", "act-1").await.unwrap());
    let refreshed = ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            account_id: "alice".to_string(),
            activity_id: "act-1".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(!refreshed);

    let row = ActivityRepository::find(&pool, "alice", "act-1").await.unwrap().unwrap();
    assert_eq!(row.client_id, Some(42));
    assert_eq!(row.scheduled_name.as_deref(), Some("Анна Кузнецова"));
    assert!(row.sent_clientbot);
}

#[tokio::test]
async fn cancelled_slots_are_invisible_to_the_matcher() {
    let pool = setup_pool().await;
    seed_stand(&pool, 5).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (slot, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;

    let reservation = ReservationRepository::list_for_slot(&pool, &slot.id)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    ReservationRepository::book_available(&pool, &reservation.id, 42, "Анна", None, None)
        .await
        .unwrap()
        .unwrap();

    krutilka::db::SlotRepository::set_cancelled(&pool, &slot.id, true).await.unwrap();

    let candidates = ReservationRepository::booked_on_date(&pool, date(2024, 3, 1))
        .await
        .unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn assignment_marker_is_applied_once() {
    let pool = setup_pool().await;
    seed_stand(&pool, 5).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (slot, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;
    let reservation = ReservationRepository::list_for_slot(&pool, &slot.id)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    assert!(!AssignmentRepository::was_applied(&pool, &reservation.id, "alice").await.unwrap());

    let first =
        AssignmentRepository::record_applied(&pool, &reservation.id, "alice", Some(42))
            .await
            .unwrap();
    assert!(first);

    // Repeated ticks never re-apply.
    let second =
        AssignmentRepository::record_applied(&pool, &reservation.id, "alice", Some(42))
            .await
            .unwrap();
    assert!(!second);
    assert!(AssignmentRepository::was_applied(&pool, &reservation.id, "alice").await.unwrap());

    let marker = AssignmentRepository::find(&pool, &reservation.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.client_id, Some(42));
}

#[tokio::test]
async fn reminder_markers_dedup_per_kind() {
    let pool = setup_pool().await;
    seed_stand(&pool, 5).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (slot, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;
    let reservation = ReservationRepository::list_for_slot(&pool, &slot.id)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    assert!(WorkoutNotificationRepository::mark_sent(&pool, &reservation.id, "4h_before")
        .await
        .unwrap());
    assert!(!WorkoutNotificationRepository::mark_sent(&pool, &reservation.id, "4h_before")
        .await
        .unwrap());

    // A different reminder kind is independent.
    assert!(WorkoutNotificationRepository::mark_sent(&pool, &reservation.id, "1h_before")
        .await
        .unwrap());

    assert!(WorkoutNotificationRepository::was_sent(&pool, &reservation.id, "4h_before")
        .await
        .unwrap());
}

#[tokio::test]
async fn upcoming_window_query_filters_by_start() {
    let pool = setup_pool().await;
    seed_stand(&pool, 5).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (morning, _) =
        seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;
    let (evening, _) =
        seed_slot(&pool, &week.id, date(2024, 3, 1), time(18, 0), time(20, 0)).await;

    for slot_id in [&morning.id, &evening.id] {
        let reservation = ReservationRepository::list_for_slot(&pool, slot_id)
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        ReservationRepository::book_available(&pool, &reservation.id, 42, "Анна", None, None)
            .await
            .unwrap()
            .unwrap();
    }

    let from = date(2024, 3, 1).and_hms_opt(9, 40, 0).unwrap();
    let to = date(2024, 3, 1).and_hms_opt(10, 10, 0).unwrap();
    let upcoming = ReservationRepository::booked_starting_within(&pool, from, to)
        .await
        .unwrap();

    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].slot_id, morning.id);
}
