mod common;

use common::{date, setup_pool};

use krutilka::db::models::NewActivityRecord;
use krutilka::db::ActivityRepository;

fn record(account: &str, activity: &str) -> NewActivityRecord {
    NewActivityRecord {
        account_id: account.to_string(),
        activity_id: activity.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn first_insert_reported_distinctly_from_refresh() {
    let pool = setup_pool().await;

    assert!(!ActivityRepository::was_seen(&pool, "alice", "act-1").await.unwrap());

    let first = ActivityRepository::record_seen(&pool, record("alice", "act-1")).await.unwrap();
    assert!(first);

    assert!(ActivityRepository::was_seen(&pool, "alice", "act-1").await.unwrap());

    let second = ActivityRepository::record_seen(&pool, record("alice", "act-1")).await.unwrap();
    assert!(!second);

    // Same activity id on another account is a separate ledger row.
    let other_account =
        ActivityRepository::record_seen(&pool, record("bob", "act-1")).await.unwrap();
    assert!(other_account);
}

#[tokio::test]
async fn merge_never_erases_known_data() {
    let pool = setup_pool().await;

    let full = NewActivityRecord {
        client_id: Some(42),
        scheduled_name: Some("Анна Кузнецова".to_string()),
        start_time: Some(date(2024, 3, 1).and_hms_opt(10, 5, 0).unwrap()),
        distance_m: Some(32_400.0),
        elapsed_seconds: Some(7_140),
        avg_power: Some(183.0),
        ..record("alice", "act-1")
    };
    ActivityRepository::record_seen(&pool, full).await.unwrap();

    // A later re-record with unknowns must not lose anything.
    let sparse = NewActivityRecord {
        profile_name: Some("Anna K".to_string()),
        fit_path: Some("data/fit/alice/act-1.fit".to_string()),
        ..record("alice", "act-1")
    };
    ActivityRepository::record_seen(&pool, sparse).await.unwrap();

    let row = ActivityRepository::find(&pool, "alice", "act-1").await.unwrap().unwrap();
    assert_eq!(row.client_id, Some(42));
    assert_eq!(row.scheduled_name.as_deref(), Some("Анна Кузнецова"));
    assert_eq!(row.profile_name.as_deref(), Some("Anna K"));
    assert_eq!(row.distance_m, Some(32_400.0));
    assert_eq!(row.elapsed_seconds, Some(7_140));
    assert_eq!(row.avg_power, Some(183.0));
    assert_eq!(row.fit_path.as_deref(), Some("data/fit/alice/act-1.fit"));
}

#[tokio::test]
async fn delivery_flags_only_move_forward() {
    let pool = setup_pool().await;

    ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            sent_clientbot: true,
            sent_strava: false,
            sent_intervals: false,
            ..record("alice", "act-1")
        },
    )
    .await
    .unwrap();

    // Retry after partial failure: strava succeeds now, clientbot reported
    // false. The recorded true must survive.
    ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            sent_clientbot: false,
            sent_strava: true,
            sent_intervals: false,
            ..record("alice", "act-1")
        },
    )
    .await
    .unwrap();

    let row = ActivityRepository::find(&pool, "alice", "act-1").await.unwrap().unwrap();
    assert!(row.sent_clientbot);
    assert!(row.sent_strava);
    assert!(!row.sent_intervals);
}

#[tokio::test]
async fn missing_fit_feed_drops_rows_once_archived() {
    let pool = setup_pool().await;

    ActivityRepository::record_seen(&pool, record("alice", "act-1")).await.unwrap();
    ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            fit_path: Some("data/fit/alice/act-2.fit".to_string()),
            ..record("alice", "act-2")
        },
    )
    .await
    .unwrap();

    let missing = ActivityRepository::list_missing_fit(&pool, Some("alice"), 10).await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].activity_id, "act-1");

    // The FIT arrives later; the row leaves the feed.
    ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            fit_path: Some("data/fit/alice/act-1.fit".to_string()),
            ..record("alice", "act-1")
        },
    )
    .await
    .unwrap();

    let missing = ActivityRepository::list_missing_fit(&pool, Some("alice"), 10).await.unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn manual_correction_wins_over_auto_attribution() {
    let pool = setup_pool().await;

    ActivityRepository::record_seen(
        &pool,
        NewActivityRecord {
            client_id: Some(42),
            distance_m: Some(10_000.0),
            ..record("alice", "act-1")
        },
    )
    .await
    .unwrap();

    let corrected =
        ActivityRepository::set_corrected_client(&pool, "alice", "act-1", Some(77)).await.unwrap();
    assert!(corrected);

    let row = ActivityRepository::find(&pool, "alice", "act-1").await.unwrap().unwrap();
    assert_eq!(row.client_id, Some(42));
    assert_eq!(row.corrected_client_id, Some(77));
    assert_eq!(row.effective_client_id(), Some(77));

    // Aggregates follow the effective attribution.
    let rows = ActivityRepository::leaderboard(&pool, None, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].client_id, 77);

    // Correcting an unknown activity reports "nothing to do".
    let missing =
        ActivityRepository::set_corrected_client(&pool, "alice", "nope", Some(1)).await.unwrap();
    assert!(!missing);
}

#[tokio::test]
async fn leaderboard_orders_by_total_distance() {
    let pool = setup_pool().await;

    for (activity, client_id, distance) in
        [("a1", 1i64, 10_000.0), ("a2", 2, 30_000.0), ("a3", 2, 5_000.0)]
    {
        ActivityRepository::record_seen(
            &pool,
            NewActivityRecord {
                client_id: Some(client_id),
                distance_m: Some(distance),
                elapsed_seconds: Some(3_600),
                ..record("alice", activity)
            },
        )
        .await
        .unwrap();
    }

    let rows = ActivityRepository::leaderboard(&pool, None, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].client_id, 2);
    assert_eq!(rows[0].activities, 2);
    assert_eq!(rows[0].total_distance_m, 35_000.0);
    assert_eq!(rows[1].client_id, 1);

    let stats = ActivityRepository::client_stats(&pool, 2).await.unwrap().unwrap();
    assert_eq!(stats.total_elapsed_seconds, 7_200);
}
