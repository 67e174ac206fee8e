use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Repository for workout reminder dedup markers, unique on
/// (reservation, notification type).
pub struct WorkoutNotificationRepository;

impl WorkoutNotificationRepository {
    pub async fn was_sent(
        pool: &SqlitePool,
        reservation_id: &str,
        notification_type: &str,
    ) -> AppResult<bool> {
        let row: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 FROM workout_notifications
            WHERE reservation_id = ? AND notification_type = ?
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .bind(notification_type)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.is_some())
    }

    /// Record that a reminder of this kind went out. Returns true only on
    /// first insert, so repeated scheduler runs send each reminder at most
    /// once.
    pub async fn mark_sent(
        pool: &SqlitePool,
        reservation_id: &str,
        notification_type: &str,
    ) -> AppResult<bool> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO workout_notifications (id, reservation_id, notification_type, sent_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(reservation_id, notification_type) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(reservation_id)
        .bind(notification_type)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
