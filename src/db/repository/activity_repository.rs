use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{ActivityRecord, LeaderboardRow, NewActivityRecord};
use crate::error::{AppError, AppResult};

const SELECT_ACTIVITY: &str = r#"
    SELECT id, account_id, activity_id, client_id, corrected_client_id,
           scheduled_name, profile_name, start_time,
           sent_clientbot, sent_strava, sent_intervals,
           distance_m, elapsed_seconds, elevation_gain_m,
           avg_power, avg_cadence, avg_heart_rate,
           fit_path, created_at, updated_at
    FROM seen_activity_ids
"#;

/// Ledger of externally observed activities, the dedup/idempotency boundary
/// for the reconciliation driver's repeated polling.
///
/// Implementation notes:
/// - `record_seen` is a single-statement upsert. Scalar fields merge with
///   COALESCE(excluded, existing) so an incoming NULL never erases recorded
///   data; the `sent_*` delivery flags merge with OR so they only move
///   forward.
/// - `corrected_client_id` is written exclusively by the manual-correction
///   path and is absent from the upsert.
pub struct ActivityRepository;

impl ActivityRepository {
    /// Existence check used to short-circuit re-processing before any
    /// expensive work (file download, matching).
    pub async fn was_seen(
        pool: &SqlitePool,
        account_id: &str,
        activity_id: &str,
    ) -> AppResult<bool> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM seen_activity_ids WHERE account_id = ? AND activity_id = ? LIMIT 1",
        )
        .bind(account_id)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.is_some())
    }

    /// Upsert an activity. Returns true only when this call inserted the row
    /// for the first time, so callers can distinguish "brand new" from
    /// "refreshed".
    pub async fn record_seen(pool: &SqlitePool, record: NewActivityRecord) -> AppResult<bool> {
        let existed = Self::was_seen(pool, &record.account_id, &record.activity_id).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO seen_activity_ids (
                id, account_id, activity_id, client_id, corrected_client_id,
                scheduled_name, profile_name, start_time,
                sent_clientbot, sent_strava, sent_intervals,
                distance_m, elapsed_seconds, elevation_gain_m,
                avg_power, avg_cadence, avg_heart_rate,
                fit_path, created_at, updated_at
            ) VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, activity_id) DO UPDATE SET
                client_id = COALESCE(excluded.client_id, seen_activity_ids.client_id),
                scheduled_name = COALESCE(excluded.scheduled_name, seen_activity_ids.scheduled_name),
                profile_name = COALESCE(excluded.profile_name, seen_activity_ids.profile_name),
                start_time = COALESCE(excluded.start_time, seen_activity_ids.start_time),
                sent_clientbot = seen_activity_ids.sent_clientbot OR excluded.sent_clientbot,
                sent_strava = seen_activity_ids.sent_strava OR excluded.sent_strava,
                sent_intervals = seen_activity_ids.sent_intervals OR excluded.sent_intervals,
                distance_m = COALESCE(excluded.distance_m, seen_activity_ids.distance_m),
                elapsed_seconds = COALESCE(excluded.elapsed_seconds, seen_activity_ids.elapsed_seconds),
                elevation_gain_m = COALESCE(excluded.elevation_gain_m, seen_activity_ids.elevation_gain_m),
                avg_power = COALESCE(excluded.avg_power, seen_activity_ids.avg_power),
                avg_cadence = COALESCE(excluded.avg_cadence, seen_activity_ids.avg_cadence),
                avg_heart_rate = COALESCE(excluded.avg_heart_rate, seen_activity_ids.avg_heart_rate),
                fit_path = COALESCE(excluded.fit_path, seen_activity_ids.fit_path),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&record.account_id)
        .bind(&record.activity_id)
        .bind(record.client_id)
        .bind(&record.scheduled_name)
        .bind(&record.profile_name)
        .bind(record.start_time)
        .bind(record.sent_clientbot)
        .bind(record.sent_strava)
        .bind(record.sent_intervals)
        .bind(record.distance_m)
        .bind(record.elapsed_seconds)
        .bind(record.elevation_gain_m)
        .bind(record.avg_power)
        .bind(record.avg_cadence)
        .bind(record.avg_heart_rate)
        .bind(&record.fit_path)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(!existed)
    }

    pub async fn find(
        pool: &SqlitePool,
        account_id: &str,
        activity_id: &str,
    ) -> AppResult<Option<ActivityRecord>> {
        let row = sqlx::query_as::<_, ActivityRecord>(&format!(
            "{SELECT_ACTIVITY} WHERE account_id = ? AND activity_id = ?"
        ))
        .bind(account_id)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> AppResult<Vec<ActivityRecord>> {
        let rows = sqlx::query_as::<_, ActivityRecord>(&format!(
            "{SELECT_ACTIVITY} ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Activities recorded without an archived FIT file, oldest first.
    /// This is the backfill feed for late FIT exports.
    pub async fn list_missing_fit(
        pool: &SqlitePool,
        account_id: Option<&str>,
        limit: i64,
    ) -> AppResult<Vec<ActivityRecord>> {
        let rows = match account_id {
            Some(account_id) => {
                sqlx::query_as::<_, ActivityRecord>(&format!(
                    "{SELECT_ACTIVITY} WHERE fit_path IS NULL AND account_id = ? ORDER BY created_at LIMIT ?"
                ))
                .bind(account_id)
                .bind(limit)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ActivityRecord>(&format!(
                    "{SELECT_ACTIVITY} WHERE fit_path IS NULL ORDER BY created_at LIMIT ?"
                ))
                .bind(limit)
                .fetch_all(pool)
                .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Manual attribution fix by an operator. The auto-resolved `client_id`
    /// is left untouched. Returns false when the activity does not exist.
    pub async fn set_corrected_client(
        pool: &SqlitePool,
        account_id: &str,
        activity_id: &str,
        client_id: Option<i64>,
    ) -> AppResult<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE seen_activity_ids
            SET corrected_client_id = ?, updated_at = ?
            WHERE account_id = ? AND activity_id = ?
            "#,
        )
        .bind(client_id)
        .bind(now)
        .bind(account_id)
        .bind(activity_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    /// Per-client totals over the cached metrics, largest distance first.
    /// Manual corrections win over auto-resolved attribution.
    pub async fn leaderboard(
        pool: &SqlitePool,
        since: Option<NaiveDateTime>,
        limit: i64,
    ) -> AppResult<Vec<LeaderboardRow>> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT COALESCE(corrected_client_id, client_id) AS client_id,
                   COUNT(*) AS activities,
                   CAST(SUM(COALESCE(distance_m, 0)) AS REAL) AS total_distance_m,
                   CAST(SUM(COALESCE(elapsed_seconds, 0)) AS INTEGER) AS total_elapsed_seconds
            FROM seen_activity_ids
            WHERE COALESCE(corrected_client_id, client_id) IS NOT NULL
              AND (? IS NULL OR start_time >= ?)
            GROUP BY COALESCE(corrected_client_id, client_id)
            ORDER BY total_distance_m DESC
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Aggregate for one client (activity count + totals).
    pub async fn client_stats(
        pool: &SqlitePool,
        client_id: i64,
    ) -> AppResult<Option<LeaderboardRow>> {
        let row = sqlx::query_as::<_, LeaderboardRow>(
            r#"
            SELECT COALESCE(corrected_client_id, client_id) AS client_id,
                   COUNT(*) AS activities,
                   CAST(SUM(COALESCE(distance_m, 0)) AS REAL) AS total_distance_m,
                   CAST(SUM(COALESCE(elapsed_seconds, 0)) AS INTEGER) AS total_elapsed_seconds
            FROM seen_activity_ids
            WHERE COALESCE(corrected_client_id, client_id) = ?
            GROUP BY COALESCE(corrected_client_id, client_id)
            "#,
        )
        .bind(client_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
