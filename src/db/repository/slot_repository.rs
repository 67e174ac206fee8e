use chrono::{Duration, NaiveTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateSlot, SessionKind, Slot};
use crate::db::repository::reservation_repository::ReservationRepository;
use crate::db::repository::week_repository::WeekRepository;
use crate::error::{AppError, AppResult};
use crate::i18n;

/// Daily template used by `create_default_slots`: eight two-hour
/// self-service windows covering 06:00–22:30.
const DEFAULT_WINDOWS: &[(u32, u32, u32, u32)] = &[
    (6, 0, 8, 0),
    (8, 0, 10, 0),
    (10, 0, 12, 0),
    (12, 0, 14, 0),
    (14, 0, 16, 0),
    (16, 0, 18, 0),
    (18, 0, 20, 0),
    (20, 30, 22, 30),
];

const SELECT_SLOT: &str = r#"
    SELECT id, week_id, slot_date, start_time, end_time, session_kind,
           instructor_name, is_cancelled, label, notes, sort_index,
           created_at, updated_at
    FROM schedule_slots
"#;

pub struct SlotRepository;

impl SlotRepository {
    /// Insert a slot and back-fill one available reservation placeholder per
    /// active stand. Returns the slot and the number of placeholders created.
    pub async fn create(pool: &SqlitePool, slot: CreateSlot) -> AppResult<(Slot, i64)> {
        if slot.end_time <= slot.start_time {
            return Err(AppError::Validation(i18n::t("validation.slot_time_order")));
        }

        let week = WeekRepository::find_by_id(pool, &slot.week_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))?;
        let week_end = week.week_start_date + Duration::days(6);
        if slot.slot_date < week.week_start_date || slot.slot_date > week_end {
            return Err(AppError::Validation(i18n::t(
                "validation.slot_date_outside_week",
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let session_kind = slot.session_kind.unwrap_or(SessionKind::SelfService);
        let label = slot.label.unwrap_or_default();
        let sort_index = slot.sort_index.unwrap_or(0);

        let row = sqlx::query_as::<_, Slot>(
            r#"
            INSERT INTO schedule_slots (
                id, week_id, slot_date, start_time, end_time, session_kind,
                instructor_name, is_cancelled, label, notes, sort_index,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
            RETURNING id, week_id, slot_date, start_time, end_time, session_kind,
                      instructor_name, is_cancelled, label, notes, sort_index,
                      created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(&slot.week_id)
        .bind(slot.slot_date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(session_kind.as_str())
        .bind(&slot.instructor_name)
        .bind(&label)
        .bind(&slot.notes)
        .bind(sort_index)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(i18n::t("conflict.slot_exists"))
            }
            _ => AppError::Database(e),
        })?;

        let placeholders = ReservationRepository::ensure_slot_capacity(pool, &row.id).await?;

        Ok((row, placeholders))
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Slot>> {
        let row = sqlx::query_as::<_, Slot>(&format!("{SELECT_SLOT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_for_week(pool: &SqlitePool, week_id: &str) -> AppResult<Vec<Slot>> {
        let rows = sqlx::query_as::<_, Slot>(&format!(
            "{SELECT_SLOT} WHERE week_id = ? ORDER BY slot_date, sort_index, start_time"
        ))
        .bind(week_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Seed a week with the default daily template. A week that already has
    /// slots is left untouched unless `force`, which clears all existing
    /// slots (and their reservations) first. Returns the number of slots
    /// created.
    pub async fn create_default_slots(
        pool: &SqlitePool,
        week_id: &str,
        force: bool,
    ) -> AppResult<i64> {
        let week = WeekRepository::find_by_id(pool, week_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM schedule_slots WHERE week_id = ?")
                .bind(week_id)
                .fetch_one(pool)
                .await
                .map_err(AppError::Database)?;

        if existing > 0 {
            if !force {
                return Ok(0);
            }
            sqlx::query("DELETE FROM schedule_slots WHERE week_id = ?")
                .bind(week_id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;
        }

        let mut created = 0i64;
        for day in 0..7 {
            let slot_date = week.week_start_date + Duration::days(day);
            for (idx, &(sh, sm, eh, em)) in DEFAULT_WINDOWS.iter().enumerate() {
                let start_time = NaiveTime::from_hms_opt(sh, sm, 0)
                    .ok_or_else(|| AppError::Validation("invalid template time".to_string()))?;
                let end_time = NaiveTime::from_hms_opt(eh, em, 0)
                    .ok_or_else(|| AppError::Validation("invalid template time".to_string()))?;

                Self::create(
                    pool,
                    CreateSlot {
                        week_id: week_id.to_string(),
                        slot_date,
                        start_time,
                        end_time,
                        session_kind: Some(SessionKind::SelfService),
                        instructor_name: None,
                        label: None,
                        notes: None,
                        sort_index: Some(idx as i64),
                    },
                )
                .await?;
                created += 1;
            }
        }

        Ok(created)
    }

    /// Duplicate every slot from the source week into the target week,
    /// shifting dates by the delta between the two Mondays. Slots whose
    /// shifted tuple already exists in the target are skipped. Returns
    /// (slots copied, reservation placeholders created).
    pub async fn copy_from_week(
        pool: &SqlitePool,
        source_week_id: &str,
        target_week_id: &str,
    ) -> AppResult<(i64, i64)> {
        let source = WeekRepository::find_by_id(pool, source_week_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))?;
        let target = WeekRepository::find_by_id(pool, target_week_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))?;

        let delta = target.week_start_date - source.week_start_date;
        let source_slots = Self::list_for_week(pool, source_week_id).await?;

        let mut slots_copied = 0i64;
        let mut placeholders_created = 0i64;

        for slot in source_slots {
            let shifted_date = slot.slot_date + delta;

            let exists: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT 1 FROM schedule_slots
                WHERE week_id = ? AND slot_date = ? AND start_time = ? AND end_time = ? AND label = ?
                "#,
            )
            .bind(target_week_id)
            .bind(shifted_date)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(&slot.label)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

            if exists.is_some() {
                continue;
            }

            let kind = SessionKind::from_str(&slot.session_kind);
            let (_, placeholders) = Self::create(
                pool,
                CreateSlot {
                    week_id: target_week_id.to_string(),
                    slot_date: shifted_date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    session_kind: kind,
                    instructor_name: slot.instructor_name.clone(),
                    label: Some(slot.label.clone()),
                    notes: slot.notes.clone(),
                    sort_index: Some(slot.sort_index),
                },
            )
            .await?;

            slots_copied += 1;
            placeholders_created += placeholders;
        }

        if slots_copied > 0 {
            WeekRepository::set_copied_from(pool, target_week_id, source_week_id).await?;
        }

        Ok((slots_copied, placeholders_created))
    }

    pub async fn set_cancelled(pool: &SqlitePool, id: &str, cancelled: bool) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let result =
            sqlx::query("UPDATE schedule_slots SET is_cancelled = ?, updated_at = ? WHERE id = ?")
                .bind(cancelled)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a slot; its reservations cascade. Returns false when the slot
    /// does not exist.
    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM schedule_slots WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
