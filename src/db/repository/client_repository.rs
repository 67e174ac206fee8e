use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{Client, TelegramLink};
use crate::error::{AppError, AppResult};

const SELECT_CLIENT: &str = r#"
    SELECT id, full_name, strava_athlete_id, intervals_api_key, created_at, updated_at
    FROM clients
"#;

/// Collaborator persistence: minimal client records and Telegram links.
/// The CRM owns the full profiles; the core only resolves ids, names and
/// delivery credentials.
pub struct ClientRepository;

impl ClientRepository {
    pub async fn upsert(
        pool: &SqlitePool,
        id: i64,
        full_name: &str,
        strava_athlete_id: Option<&str>,
        intervals_api_key: Option<&str>,
    ) -> AppResult<Client> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, full_name, strava_athlete_id, intervals_api_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                full_name = excluded.full_name,
                strava_athlete_id = COALESCE(excluded.strava_athlete_id, clients.strava_athlete_id),
                intervals_api_key = COALESCE(excluded.intervals_api_key, clients.intervals_api_key),
                updated_at = excluded.updated_at
            RETURNING id, full_name, strava_athlete_id, intervals_api_key, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(strava_athlete_id)
        .bind(intervals_api_key)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Client>> {
        let row = sqlx::query_as::<_, Client>(&format!("{SELECT_CLIENT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn search_by_name(
        pool: &SqlitePool,
        query: &str,
        limit: i64,
    ) -> AppResult<Vec<Client>> {
        let pattern = format!("%{}%", query);
        let rows = sqlx::query_as::<_, Client>(&format!(
            "{SELECT_CLIENT} WHERE full_name LIKE ? ORDER BY full_name LIMIT ?"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn find_telegram_link(
        pool: &SqlitePool,
        client_id: i64,
    ) -> AppResult<Option<TelegramLink>> {
        let row = sqlx::query_as::<_, TelegramLink>(
            r#"
            SELECT client_id, telegram_chat_id, linked_at
            FROM client_telegram_links
            WHERE client_id = ?
            "#,
        )
        .bind(client_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn link_telegram(
        pool: &SqlitePool,
        client_id: i64,
        telegram_chat_id: &str,
    ) -> AppResult<TelegramLink> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, TelegramLink>(
            r#"
            INSERT INTO client_telegram_links (client_id, telegram_chat_id, linked_at)
            VALUES (?, ?, ?)
            ON CONFLICT(client_id) DO UPDATE SET
                telegram_chat_id = excluded.telegram_chat_id,
                linked_at = excluded.linked_at
            RETURNING client_id, telegram_chat_id, linked_at
            "#,
        )
        .bind(client_id)
        .bind(telegram_chat_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
