use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::AccountAssignment;
use crate::error::{AppError, AppResult};

/// Repository for auto-assignment idempotency markers. A marker records that
/// an account's platform profile was set to the client scheduled in a
/// reservation; it is inserted once and never reverted.
pub struct AssignmentRepository;

impl AssignmentRepository {
    pub async fn was_applied(
        pool: &SqlitePool,
        reservation_id: &str,
        account_id: &str,
    ) -> AppResult<bool> {
        let row: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 FROM schedule_account_assignments
            WHERE reservation_id = ? AND account_id = ?
            LIMIT 1
            "#,
        )
        .bind(reservation_id)
        .bind(account_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.is_some())
    }

    /// Insert the marker. Returns true only on first insert; a concurrent
    /// or repeated call hits ON CONFLICT DO NOTHING and reports false.
    pub async fn record_applied(
        pool: &SqlitePool,
        reservation_id: &str,
        account_id: &str,
        client_id: Option<i64>,
    ) -> AppResult<bool> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO schedule_account_assignments (id, reservation_id, account_id, client_id, applied_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(reservation_id, account_id) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(reservation_id)
        .bind(account_id)
        .bind(client_id)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find(
        pool: &SqlitePool,
        reservation_id: &str,
        account_id: &str,
    ) -> AppResult<Option<AccountAssignment>> {
        let row = sqlx::query_as::<_, AccountAssignment>(
            r#"
            SELECT id, reservation_id, account_id, client_id, applied_at
            FROM schedule_account_assignments
            WHERE reservation_id = ? AND account_id = ?
            "#,
        )
        .bind(reservation_id)
        .bind(account_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
