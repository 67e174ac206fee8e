use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Idempotency marker: the WattAttack account's in-platform profile has been
/// set to the client scheduled in this reservation. Inserted once, never
/// reverted to "unapplied".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountAssignment {
    /// Primary key (UUID)
    pub id: String,

    /// Reservation whose client was pushed (references
    /// `schedule_reservations.id`).
    pub reservation_id: String,

    /// WattAttack account that received the profile.
    pub account_id: String,

    pub client_id: Option<i64>,

    pub applied_at: NaiveDateTime,
}
