use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Minimal client record. The CRM owns the full profile; the core only needs
/// a name for matching and the outbound-delivery credentials.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Client {
    /// CRM id.
    pub id: i64,

    pub full_name: String,

    /// Set when the client connected Strava through the broker.
    pub strava_athlete_id: Option<String>,

    /// Set when the client linked an Intervals.icu API key.
    pub intervals_api_key: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Link between a client and their Telegram chat with the client bot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TelegramLink {
    pub client_id: i64,
    pub telegram_chat_id: String,
    pub linked_at: NaiveDateTime,
}
