use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{CreateStand, Stand};
use crate::error::{AppError, AppResult};

const SELECT_STAND: &str = r#"
    SELECT id, name, code, is_active, created_at, updated_at
    FROM stands
"#;

/// Repository for the physical stand roster.
pub struct StandRepository;

impl StandRepository {
    pub async fn create(pool: &SqlitePool, stand: CreateStand) -> AppResult<Stand> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Stand>(
            r#"
            INSERT INTO stands (id, name, code, is_active, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?)
            RETURNING id, name, code, is_active, created_at, updated_at
            "#,
        )
        .bind(stand.id)
        .bind(&stand.name)
        .bind(&stand.code)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Stand {} already exists", stand.id))
            }
            _ => AppError::Database(e),
        })?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Stand>> {
        let row = sqlx::query_as::<_, Stand>(&format!("{SELECT_STAND} WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_active(pool: &SqlitePool) -> AppResult<Vec<Stand>> {
        let rows =
            sqlx::query_as::<_, Stand>(&format!("{SELECT_STAND} WHERE is_active = 1 ORDER BY id"))
                .fetch_all(pool)
                .await
                .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Deactivated stands are excluded from future capacity back-fill;
    /// existing reservation rows are kept. Returns false when the stand does
    /// not exist.
    pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> AppResult<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query("UPDATE stands SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
