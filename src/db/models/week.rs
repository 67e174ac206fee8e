use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A 7-day scheduling period identified by its Monday date.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Week {
    /// Primary key (UUID)
    pub id: String,

    /// Monday of the week (unique).
    pub week_start_date: NaiveDate,

    pub title: Option<String>,
    pub notes: Option<String>,

    /// Set when the week's slots were copied from another week.
    pub copied_from_week_id: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
