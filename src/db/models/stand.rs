use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A physical trainer position on the gym floor.
///
/// Stands are distinct from the WattAttack accounts used to observe activity
/// on them: the account-to-stand wiring lives in configuration, while the
/// stand roster here drives reservation capacity back-fill.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Stand {
    /// Roster key, matches the physical numbering on the floor.
    pub id: i64,

    pub name: String,

    /// Short label printed on the stand (unique).
    pub code: String,

    /// Inactive stands are excluded from capacity back-fill.
    pub is_active: bool,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStand {
    pub id: i64,
    pub name: String,
    pub code: String,
}
