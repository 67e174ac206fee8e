mod common;

use common::{date, seed_slot, seed_stand, seed_week, setup_pool, time};

use krutilka::db::models::{CreateSlot, ReservationStatus, UpdateReservation};
use krutilka::db::{
    monday_of, ReservationRepository, SlotRepository, StandRepository, WeekRepository,
};
use krutilka::error::AppError;

#[tokio::test]
async fn get_or_create_week_normalizes_to_monday_and_is_idempotent() {
    let pool = setup_pool().await;

    // 2024-03-01 is a Friday; its Monday is 2024-02-26.
    let week = WeekRepository::get_or_create(&pool, date(2024, 3, 1)).await.unwrap();
    assert_eq!(week.week_start_date, date(2024, 2, 26));

    // Any other day of the same week resolves to the same row.
    let again = WeekRepository::get_or_create(&pool, date(2024, 2, 28)).await.unwrap();
    assert_eq!(again.id, week.id);

    assert_eq!(monday_of(date(2024, 2, 26)), date(2024, 2, 26));
}

#[tokio::test]
async fn explicit_create_week_conflicts_on_duplicate() {
    let pool = setup_pool().await;

    WeekRepository::create(&pool, date(2024, 3, 4), None, None).await.unwrap();
    let err = WeekRepository::create(&pool, date(2024, 3, 6), None, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn create_slot_rejects_inverted_times() {
    let pool = setup_pool().await;
    let week = seed_week(&pool, date(2024, 3, 1)).await;

    let err = SlotRepository::create(
        &pool,
        CreateSlot {
            week_id: week.id.clone(),
            slot_date: date(2024, 3, 1),
            start_time: time(12, 0),
            end_time: time(10, 0),
            session_kind: None,
            instructor_name: None,
            label: None,
            notes: None,
            sort_index: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn create_slot_conflicts_on_identical_tuple() {
    let pool = setup_pool().await;
    let week = seed_week(&pool, date(2024, 3, 1)).await;

    seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;

    let err = SlotRepository::create(
        &pool,
        CreateSlot {
            week_id: week.id.clone(),
            slot_date: date(2024, 3, 1),
            start_time: time(10, 0),
            end_time: time(12, 0),
            session_kind: None,
            instructor_name: None,
            label: None,
            notes: None,
            sort_index: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn capacity_is_complete_and_idempotent() {
    let pool = setup_pool().await;
    seed_stand(&pool, 1).await;
    seed_stand(&pool, 2).await;
    seed_stand(&pool, 3).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (slot, placeholders) =
        seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;
    assert_eq!(placeholders, 3);

    // Re-running is a no-op.
    let again = ReservationRepository::ensure_slot_capacity(&pool, &slot.id).await.unwrap();
    assert_eq!(again, 0);

    // A new stand in the roster back-fills exactly one row.
    seed_stand(&pool, 4).await;
    let filled = ReservationRepository::ensure_slot_capacity(&pool, &slot.id).await.unwrap();
    assert_eq!(filled, 1);

    // Exactly one reservation per stand: no duplicates, no gaps.
    let reservations = ReservationRepository::list_for_slot(&pool, &slot.id).await.unwrap();
    let mut stand_ids: Vec<i64> = reservations.iter().filter_map(|r| r.stand_id).collect();
    stand_ids.sort();
    assert_eq!(stand_ids, vec![1, 2, 3, 4]);
    assert!(reservations.iter().all(|r| r.status == "available" && r.client_id.is_none()));
}

#[tokio::test]
async fn booking_is_won_by_exactly_one_caller() {
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

    let first = ReservationRepository::book_available(
        &pool,
        &reservation.id,
        42,
        "Анна Кузнецова",
        Some("admin"),
        None,
    );
    let second = ReservationRepository::book_available(
        &pool,
        &reservation.id,
        43,
        "Борис Волков",
        Some("clientbot"),
        None,
    );

    let (first, second) = tokio::join!(first, second);
    let first = first.unwrap();
    let second = second.unwrap();

    // Exactly one caller observes the committed booking.
    assert!(first.is_some() ^ second.is_some());

    let winner = first.or(second).unwrap();
    assert_eq!(winner.status, "booked");

    let row = ReservationRepository::find_by_id(&pool, &reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.client_id, winner.client_id);
}

#[tokio::test]
async fn clear_resets_to_available_placeholder() {
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

    let cleared = ReservationRepository::clear(&pool, &reservation.id)
        .await
        .unwrap()
        .unwrap();

    // Same row, back to the placeholder state; stand mapping survives.
    assert_eq!(cleared.id, reservation.id);
    assert_eq!(cleared.stand_id, Some(5));
    assert_eq!(cleared.status, "available");
    assert!(cleared.client_id.is_none());

    // And it is bookable again.
    let rebooked =
        ReservationRepository::book_available(&pool, &reservation.id, 7, "Виктор", None, None)
            .await
            .unwrap();
    assert!(rebooked.is_some());
}

#[tokio::test]
async fn update_to_available_drops_client() {
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

    let updated = ReservationRepository::update(
        &pool,
        &reservation.id,
        UpdateReservation {
            status: Some(ReservationStatus::Available),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.status, "available");
    assert!(updated.client_id.is_none());
    assert!(updated.client_name.is_none());
}

#[tokio::test]
async fn default_template_seeds_once() {
    let pool = setup_pool().await;
    seed_stand(&pool, 1).await;
    let week = seed_week(&pool, date(2024, 3, 1)).await;

    let created = SlotRepository::create_default_slots(&pool, &week.id, false).await.unwrap();
    assert_eq!(created, 56); // 8 windows × 7 days

    // Second non-forced call is a no-op.
    let second = SlotRepository::create_default_slots(&pool, &week.id, false).await.unwrap();
    assert_eq!(second, 0);

    // Forced re-seed clears and recreates.
    let forced = SlotRepository::create_default_slots(&pool, &week.id, true).await.unwrap();
    assert_eq!(forced, 56);

    let slots = SlotRepository::list_for_week(&pool, &week.id).await.unwrap();
    assert_eq!(slots.len(), 56);
    assert!(slots.iter().all(|s| s.session_kind == "self_service"));
    assert_eq!(slots.iter().map(|s| s.start_time).min().unwrap(), time(6, 0));
    assert_eq!(slots.iter().map(|s| s.end_time).max().unwrap(), time(22, 30));
}

#[tokio::test]
async fn copy_week_shifts_dates_and_skips_existing() {
    let pool = setup_pool().await;
    seed_stand(&pool, 1).await;

    // A starts Monday 2024-01-01, B starts Monday 2024-01-08.
    let week_a = seed_week(&pool, date(2024, 1, 1)).await;
    let week_b = seed_week(&pool, date(2024, 1, 8)).await;

    seed_slot(&pool, &week_a.id, date(2024, 1, 1), time(10, 0), time(12, 0)).await;
    seed_slot(&pool, &week_a.id, date(2024, 1, 3), time(18, 0), time(20, 0)).await;

    let (copied, placeholders) =
        SlotRepository::copy_from_week(&pool, &week_a.id, &week_b.id).await.unwrap();
    assert_eq!(copied, 2);
    assert_eq!(placeholders, 2);

    let slots_b = SlotRepository::list_for_week(&pool, &week_b.id).await.unwrap();
    assert_eq!(slots_b.len(), 2);
    assert_eq!(slots_b[0].slot_date, date(2024, 1, 8));
    assert_eq!(slots_b[0].start_time, time(10, 0));
    assert_eq!(slots_b[1].slot_date, date(2024, 1, 10));
    assert_eq!(slots_b[1].end_time, time(20, 0));

    // Re-copy skips everything that already exists.
    let (recopied, _) = SlotRepository::copy_from_week(&pool, &week_a.id, &week_b.id).await.unwrap();
    assert_eq!(recopied, 0);

    let target = WeekRepository::find_by_id(&pool, &week_b.id).await.unwrap().unwrap();
    assert_eq!(target.copied_from_week_id, Some(week_a.id.clone()));
}

#[tokio::test]
async fn copy_seating_transfers_by_stand_and_reports_missing() {
    let pool = setup_pool().await;
    seed_stand(&pool, 1).await;
    seed_stand(&pool, 2).await;

    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (source, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;

    // Book both stands in the source slot.
    for (reservation, (client_id, name)) in ReservationRepository::list_for_slot(&pool, &source.id)
        .await
        .unwrap()
        .iter()
        .zip([(42i64, "Анна"), (43i64, "Борис")])
    {
        ReservationRepository::book_available(&pool, &reservation.id, client_id, name, None, None)
            .await
            .unwrap()
            .unwrap();
    }

    // Target slot only has stand 1: stand 2 is deactivated before creation.
    StandRepository::set_active(&pool, 2, false).await.unwrap();
    let (target, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(14, 0), time(16, 0)).await;

    let outcome = ReservationRepository::copy_slot_seating(&pool, &source.id, &target.id)
        .await
        .unwrap();

    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.cleared, 0);
    assert_eq!(outcome.missing_stands, vec![2]);

    let target_rows = ReservationRepository::list_for_slot(&pool, &target.id).await.unwrap();
    assert_eq!(target_rows.len(), 1);
    assert_eq!(target_rows[0].client_id, Some(42));
    assert_eq!(target_rows[0].status, "booked");
}

#[tokio::test]
async fn clear_for_slot_resets_all_and_resyncs() {
    let pool = setup_pool().await;
    seed_stand(&pool, 1).await;
    seed_stand(&pool, 2).await;
    let week = seed_week(&pool, date(2024, 3, 1)).await;
    let (slot, _) = seed_slot(&pool, &week.id, date(2024, 3, 1), time(10, 0), time(12, 0)).await;

    for reservation in ReservationRepository::list_for_slot(&pool, &slot.id).await.unwrap() {
        ReservationRepository::book_available(&pool, &reservation.id, 42, "Анна", None, None)
            .await
            .unwrap()
            .unwrap();
    }

    let cleared = ReservationRepository::clear_for_slot(&pool, &slot.id).await.unwrap();
    assert_eq!(cleared, 2);

    let rows = ReservationRepository::list_for_slot(&pool, &slot.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == "available" && r.client_id.is_none()));
}
