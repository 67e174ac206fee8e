use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};

use crate::db::models::BookedReservation;

/// Which pass of the matcher produced the attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Stand,
    Name,
}

#[derive(Debug, Clone)]
pub struct ActivityMatch<'a> {
    pub reservation: &'a BookedReservation,
    pub matched_by: MatchedBy,
}

/// Normalize a client name for comparison: lowercase, `ё` → `е`, whitespace
/// collapsed to single spaces.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace('ё', "е")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn name_tokens(name: &str) -> BTreeSet<String> {
    normalize_name(name)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// A candidate client name matches a reported athlete name when the
/// normalized strings are equal, the token sets are equal, or the
/// candidate's tokens are a subset of the reported name's tokens
/// ("Иванов" matches "Пётр Иванов").
pub fn names_match(candidate: &str, reported: &str) -> bool {
    let cand_norm = normalize_name(candidate);
    let rep_norm = normalize_name(reported);
    if cand_norm.is_empty() || rep_norm.is_empty() {
        return false;
    }
    if cand_norm == rep_norm {
        return true;
    }

    let cand_tokens = name_tokens(candidate);
    let rep_tokens = name_tokens(reported);
    cand_tokens == rep_tokens || cand_tokens.is_subset(&rep_tokens)
}

fn window_contains(res: &BookedReservation, at: NaiveDateTime, grace: Duration) -> bool {
    let start = res.slot_date.and_time(res.start_time) - grace;
    let end = res.slot_date.and_time(res.end_time) + grace;
    at >= start && at <= end
}

fn start_distance(res: &BookedReservation, at: NaiveDateTime) -> Duration {
    let start = res.slot_date.and_time(res.start_time);
    if at >= start {
        at - start
    } else {
        start - at
    }
}

/// Among the candidates whose widened window contains `at`, pick the one
/// whose slot start is numerically closest to `at`.
fn nearest<'a, I>(matching: I, at: NaiveDateTime) -> Option<&'a BookedReservation>
where
    I: Iterator<Item = &'a BookedReservation>,
{
    matching.min_by_key(|res| start_distance(res, at))
}

/// First pass: candidates on the account's own stands.
fn stand_pass<'a>(
    candidates: &'a [BookedReservation],
    stand_ids: &[i64],
    at: NaiveDateTime,
    grace: Duration,
) -> Option<&'a BookedReservation> {
    nearest(
        candidates.iter().filter(|res| {
            res.stand_id.map(|id| stand_ids.contains(&id)).unwrap_or(false)
                && window_contains(res, at, grace)
        }),
        at,
    )
}

/// Second pass: any stand, client name matching the reported athlete name.
fn name_pass<'a>(
    candidates: &'a [BookedReservation],
    reported_name: &str,
    at: NaiveDateTime,
    grace: Duration,
) -> Option<&'a BookedReservation> {
    nearest(
        candidates.iter().filter(|res| {
            window_contains(res, at, grace)
                && res
                    .client_name
                    .as_deref()
                    .map(|name| names_match(name, reported_name))
                    .unwrap_or(false)
        }),
        at,
    )
}

/// Attribute an observed activity to a scheduled client.
///
/// `candidates` are the booked reservations on the activity's local calendar
/// date (with slot time windows); `stand_ids` are the stands wired to the
/// observing account; `at` is the activity start in local time.
///
/// The stand wiring is a static approximation (riders occasionally swap
/// stands), so when the platform reports an athlete display name a second,
/// stand-independent search runs over client names. The stand-based result
/// wins only when its client name also equals the reported name; otherwise a
/// name-based match takes precedence.
pub fn match_activity<'a>(
    candidates: &'a [BookedReservation],
    stand_ids: &[i64],
    at: NaiveDateTime,
    reported_name: Option<&str>,
    grace_minutes: i64,
) -> Option<ActivityMatch<'a>> {
    let grace = Duration::minutes(grace_minutes);

    let by_stand = stand_pass(candidates, stand_ids, at, grace);
    let by_name = reported_name
        .filter(|name| !name.trim().is_empty())
        .and_then(|name| name_pass(candidates, name, at, grace));

    match (by_stand, by_name, reported_name) {
        (Some(stand_res), Some(name_res), Some(reported)) => {
            let stand_client_matches = stand_res
                .client_name
                .as_deref()
                .map(|name| normalize_name(name) == normalize_name(reported))
                .unwrap_or(false);
            if stand_client_matches {
                Some(ActivityMatch {
                    reservation: stand_res,
                    matched_by: MatchedBy::Stand,
                })
            } else {
                Some(ActivityMatch {
                    reservation: name_res,
                    matched_by: MatchedBy::Name,
                })
            }
        }
        (Some(stand_res), None, _) => Some(ActivityMatch {
            reservation: stand_res,
            matched_by: MatchedBy::Stand,
        }),
        (None, Some(name_res), _) => Some(ActivityMatch {
            reservation: name_res,
            matched_by: MatchedBy::Name,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn candidate(
        id: &str,
        stand_id: i64,
        client_id: i64,
        client_name: &str,
        start: (u32, u32),
        end: (u32, u32),
    ) -> BookedReservation {
        BookedReservation {
            reservation_id: id.to_string(),
            slot_id: format!("slot-{}", id),
            stand_id: Some(stand_id),
            client_id: Some(client_id),
            client_name: Some(client_name.to_string()),
            slot_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn normalize_name_folds_case_yo_and_whitespace() {
        assert_eq!(normalize_name("  Пётр   Иванов "), "петр иванов");
        assert_eq!(normalize_name("Anna SMITH"), "anna smith");
    }

    #[test]
    fn names_match_token_subset() {
        assert!(names_match("Иванов", "Пётр Иванов"));
        assert!(names_match("Иванов Петр", "Петр Иванов"));
        assert!(!names_match("Сидоров", "Петр Иванов"));
    }

    #[test]
    fn window_edge_inside_grace_matches() {
        // Slot 10:00–12:00, grace 30: 09:31 matches, 09:29 does not.
        let candidates = vec![candidate("r1", 5, 42, "Анна Кузнецова", (10, 0), (12, 0))];

        let hit = match_activity(&candidates, &[5], at(9, 31), None, 30);
        assert_eq!(hit.unwrap().reservation.reservation_id, "r1");

        let miss = match_activity(&candidates, &[5], at(9, 29), None, 30);
        assert!(miss.is_none());
    }

    #[test]
    fn nearest_slot_start_wins_tiebreak() {
        // Both windows (widened) contain 11:50; the 12:00 slot start is closer.
        let candidates = vec![
            candidate("morning", 5, 1, "Анна", (10, 0), (12, 0)),
            candidate("noon", 5, 2, "Борис", (12, 0), (14, 0)),
        ];

        let hit = match_activity(&candidates, &[5], at(11, 50), None, 30).unwrap();
        assert_eq!(hit.reservation.reservation_id, "noon");
    }

    #[test]
    fn stand_pass_ignores_other_stands_without_name() {
        let candidates = vec![candidate("r1", 7, 42, "Анна", (10, 0), (12, 0))];

        // Account watches stand 5 only; no athlete name reported.
        assert!(match_activity(&candidates, &[5], at(10, 30), None, 30).is_none());
    }

    #[test]
    fn name_pass_corrects_stand_swap() {
        // Schedule expects Анна on stand 5, but the reported athlete name
        // matches Борис who is booked on stand 7: the rider swapped stands.
        let candidates = vec![
            candidate("on-account-stand", 5, 1, "Анна Кузнецова", (10, 0), (12, 0)),
            candidate("other-stand", 7, 2, "Борис Волков", (10, 0), (12, 0)),
        ];

        let hit =
            match_activity(&candidates, &[5], at(10, 15), Some("Борис Волков"), 30).unwrap();
        assert_eq!(hit.reservation.reservation_id, "other-stand");
        assert_eq!(hit.matched_by, MatchedBy::Name);
    }

    #[test]
    fn stand_pass_preferred_when_names_agree() {
        let candidates = vec![
            candidate("on-account-stand", 5, 1, "Анна Кузнецова", (10, 0), (12, 0)),
            candidate("other-stand", 7, 2, "Анна Кузнецова", (10, 0), (12, 0)),
        ];

        let hit =
            match_activity(&candidates, &[5], at(10, 15), Some("Анна Кузнецова"), 30).unwrap();
        assert_eq!(hit.reservation.reservation_id, "on-account-stand");
        assert_eq!(hit.matched_by, MatchedBy::Stand);
    }

    #[test]
    fn unattributed_when_no_pass_matches() {
        let candidates = vec![candidate("r1", 5, 42, "Анна", (10, 0), (12, 0))];

        let hit = match_activity(&candidates, &[9], at(18, 0), Some("Виктор"), 30);
        assert!(hit.is_none());
    }
}
