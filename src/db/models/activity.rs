use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Ledger entry for one externally observed workout, keyed by
/// (account, activity id).
///
/// The row is inserted the first time an activity id is seen for an account
/// and updated in place afterwards: scalar fields merge with
/// COALESCE(incoming, existing) so late-arriving data (the FIT file usually
/// lags the activity summary) fills gaps without erasing known values, and
/// the `sent_*` delivery flags only move forward.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Primary key (UUID)
    pub id: String,

    /// WattAttack account the activity was observed on.
    pub account_id: String,

    /// Platform-assigned activity id.
    pub activity_id: String,

    /// Client resolved by the matcher; null when unattributed.
    pub client_id: Option<i64>,

    /// Manual attribution fix set by an operator. Read preferentially over
    /// `client_id`, never written by the reconciliation loop.
    pub corrected_client_id: Option<i64>,

    /// Name of the client the schedule expected on that stand.
    pub scheduled_name: Option<String>,

    /// Athlete display name reported by the platform, if any.
    pub profile_name: Option<String>,

    /// Activity start in local time.
    pub start_time: Option<NaiveDateTime>,

    /// Delivery flags; once true they stay true across re-recording.
    pub sent_clientbot: bool,
    pub sent_strava: bool,
    pub sent_intervals: bool,

    // Cached performance metrics from the activity summary.
    pub distance_m: Option<f64>,
    pub elapsed_seconds: Option<i64>,
    pub elevation_gain_m: Option<f64>,
    pub avg_power: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub avg_heart_rate: Option<f64>,

    /// Path of the archived FIT file, if downloaded.
    pub fit_path: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ActivityRecord {
    /// Effective attribution: the operator's correction wins over the
    /// auto-resolved client.
    pub fn effective_client_id(&self) -> Option<i64> {
        self.corrected_client_id.or(self.client_id)
    }
}

/// Input for `ActivityRepository::record_seen`. All scalar fields are
/// optional; `None` never overwrites a previously recorded value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewActivityRecord {
    pub account_id: String,
    pub activity_id: String,
    pub client_id: Option<i64>,
    pub scheduled_name: Option<String>,
    pub profile_name: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub sent_clientbot: bool,
    pub sent_strava: bool,
    pub sent_intervals: bool,
    pub distance_m: Option<f64>,
    pub elapsed_seconds: Option<i64>,
    pub elevation_gain_m: Option<f64>,
    pub avg_power: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub fit_path: Option<String>,
}

/// Per-client aggregate over the ledger's cached metrics.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaderboardRow {
    pub client_id: i64,
    pub activities: i64,
    pub total_distance_m: f64,
    pub total_elapsed_seconds: i64,
}
