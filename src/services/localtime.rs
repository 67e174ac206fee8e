use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Time helpers for the studio's local zone.
///
/// Activity timestamps arrive from the platform in UTC; slot dates and times
/// are stored naive in local time. All window/date comparisons happen in
/// local time, converted here at the boundary. The zone is a configured
/// fixed UTC offset (Europe/Moscow = +3, no DST).
pub fn utc_to_local(at: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDateTime {
    at.naive_utc() + Duration::hours(utc_offset_hours as i64)
}

pub fn now_local(utc_offset_hours: i32) -> NaiveDateTime {
    utc_to_local(Utc::now(), utc_offset_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn converts_utc_to_moscow() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 7, 5, 0).unwrap();
        let local = utc_to_local(utc, 3);
        assert_eq!(local.to_string(), "2024-03-01 10:05:00");
    }

    #[test]
    fn midnight_rollover() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 22, 30, 0).unwrap();
        let local = utc_to_local(utc, 3);
        assert_eq!(local.date().to_string(), "2024-03-02");
    }
}
