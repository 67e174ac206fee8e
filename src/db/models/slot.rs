use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    SelfService,
    Instructor,
    Race,
}

impl SessionKind {
    /// Convert from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "self_service" => Some(SessionKind::SelfService),
            "instructor" => Some(SessionKind::Instructor),
            "race" => Some(SessionKind::Race),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::SelfService => "self_service",
            SessionKind::Instructor => "instructor",
            SessionKind::Race => "race",
        }
    }
}

impl From<SessionKind> for String {
    fn from(kind: SessionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A bookable time interval within a week, subdivided per stand by
/// reservation rows. Unique on (week, date, start, end, label).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Slot {
    /// Primary key (UUID)
    pub id: String,

    /// Owning week (references `schedule_weeks.id`)
    pub week_id: String,

    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,

    /// 'self_service', 'instructor' or 'race'
    pub session_kind: String,

    pub instructor_name: Option<String>,

    /// Cancelled slots stay visible in the grid but are not bookable.
    pub is_cancelled: bool,

    /// Free-form label; part of the uniqueness tuple so two different
    /// sessions may share a time window.
    pub label: String,

    pub notes: Option<String>,

    /// Display order within the day.
    pub sort_index: i64,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Data required to create a slot. `session_kind`, `label` and `sort_index`
/// are defaulted by repository logic when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlot {
    pub week_id: String,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub session_kind: Option<SessionKind>,
    pub instructor_name: Option<String>,
    pub label: Option<String>,
    pub notes: Option<String>,
    pub sort_index: Option<i64>,
}
