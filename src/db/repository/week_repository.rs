use chrono::{Datelike, Duration, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::Week;
use crate::error::{AppError, AppResult};
use crate::i18n;

/// Repository for schedule weeks.
///
/// A week is keyed by its Monday date. `get_or_create` is the race-safe
/// entry point: concurrent callers both insert with ON CONFLICT DO NOTHING
/// and the loser re-reads the winner's row.
pub struct WeekRepository;

/// Normalize any date to the Monday of its week.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

impl WeekRepository {
    /// Return the week containing `date`, creating it if missing.
    pub async fn get_or_create(pool: &SqlitePool, date: NaiveDate) -> AppResult<Week> {
        let week_start = monday_of(date);
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO schedule_weeks (id, week_start_date, title, notes, copied_from_week_id, created_at, updated_at)
            VALUES (?, ?, NULL, NULL, NULL, ?, ?)
            ON CONFLICT(week_start_date) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(week_start)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        // Re-read: either our insert or the concurrent winner's row.
        Self::find_by_start_date(pool, week_start)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))
    }

    /// Explicitly create a week. Fails with Conflict when the Monday date is
    /// already taken; use `get_or_create` for the idempotent path.
    pub async fn create(
        pool: &SqlitePool,
        date: NaiveDate,
        title: Option<String>,
        notes: Option<String>,
    ) -> AppResult<Week> {
        let week_start = monday_of(date);
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Week>(
            r#"
            INSERT INTO schedule_weeks (id, week_start_date, title, notes, copied_from_week_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            RETURNING id, week_start_date, title, notes, copied_from_week_id, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(week_start)
        .bind(title)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(i18n::t("conflict.week_exists"))
            }
            _ => AppError::Database(e),
        })?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Week>> {
        let row = sqlx::query_as::<_, Week>(
            r#"
            SELECT id, week_start_date, title, notes, copied_from_week_id, created_at, updated_at
            FROM schedule_weeks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_start_date(
        pool: &SqlitePool,
        week_start: NaiveDate,
    ) -> AppResult<Option<Week>> {
        let row = sqlx::query_as::<_, Week>(
            r#"
            SELECT id, week_start_date, title, notes, copied_from_week_id, created_at, updated_at
            FROM schedule_weeks
            WHERE week_start_date = ?
            "#,
        )
        .bind(week_start)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list(pool: &SqlitePool, limit: i64) -> AppResult<Vec<Week>> {
        let rows = sqlx::query_as::<_, Week>(
            r#"
            SELECT id, week_start_date, title, notes, copied_from_week_id, created_at, updated_at
            FROM schedule_weeks
            ORDER BY week_start_date DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn set_copied_from(
        pool: &SqlitePool,
        week_id: &str,
        source_week_id: &str,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            "UPDATE schedule_weeks SET copied_from_week_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(source_week_id)
        .bind(now)
        .bind(week_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Delete a week; slots and their reservations cascade. Returns false
    /// when the week does not exist.
    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM schedule_weeks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
