use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Dedup marker for a scheduled reminder: one row per
/// (reservation, notification type). Repeated scheduler runs insert with
/// ON CONFLICT DO NOTHING, so each reminder kind fires at most once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WorkoutNotification {
    /// Primary key (UUID)
    pub id: String,

    pub reservation_id: String,

    /// Reminder kind, e.g. '4h_before'.
    pub notification_type: String,

    pub sent_at: NaiveDateTime,
}
