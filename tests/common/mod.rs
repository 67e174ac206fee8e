#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use krutilka::db::models::{CreateSlot, CreateStand, Slot, Stand, Week};
use krutilka::db::{SlotRepository, StandRepository, WeekRepository};

/// Fresh in-memory database with migrations applied. A single connection
/// keeps the in-memory database alive for the whole test.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub async fn seed_stand(pool: &SqlitePool, id: i64) -> Stand {
    StandRepository::create(
        pool,
        CreateStand {
            id,
            name: format!("Станок {}", id),
            code: format!("S{}", id),
        },
    )
    .await
    .expect("failed to create stand")
}

pub async fn seed_week(pool: &SqlitePool, any_date: NaiveDate) -> Week {
    WeekRepository::get_or_create(pool, any_date)
        .await
        .expect("failed to create week")
}

pub async fn seed_slot(
    pool: &SqlitePool,
    week_id: &str,
    slot_date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> (Slot, i64) {
    SlotRepository::create(
        pool,
        CreateSlot {
            week_id: week_id.to_string(),
            slot_date,
            start_time: start,
            end_time: end,
            session_kind: None,
            instructor_name: None,
            label: None,
            notes: None,
            sort_index: None,
        },
    )
    .await
    .expect("failed to create slot")
}
