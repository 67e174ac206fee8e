use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Available,
    Booked,
    Cancelled,
    Legacy,
    Hold,
    Pending,
    Waitlist,
    Blocked,
}

impl ReservationStatus {
    /// Convert from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(ReservationStatus::Available),
            "booked" => Some(ReservationStatus::Booked),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "legacy" => Some(ReservationStatus::Legacy),
            "hold" => Some(ReservationStatus::Hold),
            "pending" => Some(ReservationStatus::Pending),
            "waitlist" => Some(ReservationStatus::Waitlist),
            "blocked" => Some(ReservationStatus::Blocked),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Available => "available",
            ReservationStatus::Booked => "booked",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Legacy => "legacy",
            ReservationStatus::Hold => "hold",
            ReservationStatus::Pending => "pending",
            ReservationStatus::Waitlist => "waitlist",
            ReservationStatus::Blocked => "blocked",
        }
    }
}

impl From<ReservationStatus> for String {
    fn from(status: ReservationStatus) -> Self {
        status.as_str().to_string()
    }
}

/// The booking of one stand within one slot: the indivisible booking unit.
///
/// Placeholder rows (status 'available', no client) are back-filled for every
/// active stand so that booking is always a conditional UPDATE of an existing
/// row, never an INSERT race. Clearing a booking resets the row to the
/// placeholder instead of deleting it, so the historical stand mapping
/// survives.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    /// Primary key (UUID)
    pub id: String,

    /// Owning slot (references `schedule_slots.id`)
    pub slot_id: String,

    /// Physical stand. Null on legacy rows, which are identified by
    /// `stand_code` instead.
    pub stand_id: Option<i64>,

    pub stand_code: Option<String>,

    /// Booked client; null means the stand is free.
    pub client_id: Option<i64>,
    pub client_name: Option<String>,

    /// 'available', 'booked', 'cancelled', 'legacy', 'hold', 'pending',
    /// 'waitlist', 'blocked'
    pub status: String,

    /// Who created the booking ('admin', 'clientbot', ...)
    pub source: Option<String>,

    pub notes: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Mutable reservation fields for direct admin edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReservation {
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub status: Option<ReservationStatus>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// A booked reservation joined with its slot's date and time window.
/// This is the matcher's candidate row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookedReservation {
    pub reservation_id: String,
    pub slot_id: String,
    pub stand_id: Option<i64>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Result of copying seating from one slot to another.
#[derive(Debug, Clone, Serialize)]
pub struct CopySeatingOutcome {
    pub updated: i64,
    pub cleared: i64,
    /// Stands assigned in the source slot but absent from the target slot.
    pub missing_stands: Vec<i64>,
}
