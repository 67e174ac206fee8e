/*
Simple i18n helper for the backend.

This module provides:
- A tiny embedded translations store for RU/EN (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let msg = i18n::t("conflict.stand_taken");
    let msg_with = i18n::tr(None, "messages.workout_report", Some(&[("date", "01.03"), ("distance", "32.4"), ("duration", "1:58"), ("power", "183")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `ru`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "ru";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const RU_JSON: &str = r#"
{
  "validation.slot_time_order": "Время окончания должно быть позже времени начала",
  "validation.slot_date_outside_week": "Дата занятия не попадает в выбранную неделю",
  "conflict.week_exists": "Неделя с этой датой понедельника уже существует",
  "conflict.slot_exists": "Занятие с таким временем и названием уже есть в расписании",
  "conflict.stand_taken": "Станок уже занят в этом слоте",
  "not_found.week": "Неделя не найдена",
  "not_found.slot": "Слот не найден",
  "not_found.reservation": "Бронирование не найдено",
  "not_found.client": "Клиент не найден",
  "not_found.activity": "Активность не найдена",
  "reservation.booked": "Станок забронирован",
  "reservation.cleared": "Бронирование снято, станок свободен",
  "messages.workout_report": "🚴 Тренировка {date}\n\n📏 Дистанция: {distance} км\n⏱ Время: {duration}\n⛰ Набор: {elevation} м\n⚡ Мощность: {power} Вт\n❤️ Пульс: {heart_rate}",
  "messages.workout_report_no_file": "🚴 Тренировка {date} записана, но файл ещё не готов. Пришлём, как только появится.",
  "messages.assignments_header": "🔧 Назначения профилей на ближайшие занятия:",
  "messages.assignment_line": "• {client} → станок {stand} ({time})",
  "messages.assignment_observe_suffix": "(режим наблюдения — профили не менялись)",
  "messages.unmatched_activity": "⚠️ Активность {activity} на аккаунте {account} не сопоставлена ни с одним клиентом",
  "messages.session_reminder": "⏰ Напоминание: тренировка сегодня в {time}",
  "app.name": "Крутилка"
}
"#;

const EN_JSON: &str = r#"
{
  "validation.slot_time_order": "End time must be after start time",
  "validation.slot_date_outside_week": "Slot date falls outside the selected week",
  "conflict.week_exists": "A week with this Monday date already exists",
  "conflict.slot_exists": "A slot with this time and label already exists in the schedule",
  "conflict.stand_taken": "Stand is already occupied in this slot",
  "not_found.week": "Week not found",
  "not_found.slot": "Slot not found",
  "not_found.reservation": "Reservation not found",
  "not_found.client": "Client not found",
  "not_found.activity": "Activity not found",
  "reservation.booked": "Stand booked",
  "reservation.cleared": "Reservation cleared, stand is free",
  "messages.workout_report": "🚴 Workout {date}\n\n📏 Distance: {distance} km\n⏱ Time: {duration}\n⛰ Elevation: {elevation} m\n⚡ Power: {power} W\n❤️ Heart rate: {heart_rate}",
  "messages.workout_report_no_file": "🚴 Workout {date} recorded, but the file is not ready yet. We'll send it as soon as it appears.",
  "messages.assignments_header": "🔧 Profile assignments for upcoming sessions:",
  "messages.assignment_line": "• {client} → stand {stand} ({time})",
  "messages.assignment_observe_suffix": "(observe mode — no profiles were changed)",
  "messages.unmatched_activity": "⚠️ Activity {activity} on account {account} could not be matched to any client",
  "messages.session_reminder": "⏰ Reminder: your session today at {time}",
  "app.name": "Krutilka"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    // Parse RU
    let ru_map: HashMap<String, String> = serde_json::from_str(RU_JSON).unwrap_or_else(|e| {
        panic!("failed to parse RU_JSON in i18n module: {}", e);
    });
    out.insert("ru".to_string(), ru_map);

    // Parse EN
    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Translate a key using an explicit language (or default if None).
///
/// - `lang`: optional language code (`"ru"`, `"en"`, ...). If None, DEFAULT_LANG is used.
/// - `key`: translation key (flat string, e.g. "conflict.stand_taken").
/// - `params`: optional slice of (name, value) for placeholder replacement. Replacements use single-brace placeholders `{name}`.
///
/// Returns the translated and parameter-substituted string. If no translation is found,
/// returns a sensible fallback (default language value or the key itself).
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    // Try requested language
    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        // Fallback to default language
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        // If still missing, return the key itself (useful in logs)
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

/// Convenience wrapper: translate using default language (DEFAULT_LANG).
pub fn t(key: &str) -> String {
    tr(None, key, None)
}

/// Convenience wrapper with params (default language).
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(None, key, Some(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr_basic() {
        let s = tr(Some("ru"), "conflict.stand_taken", None);
        assert!(s.contains("Станок"));
    }

    #[test]
    fn test_t_with_params() {
        let s = t_with(
            "messages.assignment_line",
            &[("client", "Иван Петров"), ("stand", "5"), ("time", "10:00")],
        );
        assert!(s.contains("Иван Петров"));
        assert!(s.contains("станок 5"));
    }

    #[test]
    fn test_fallback_to_default() {
        // Unknown language falls back to default (ru)
        let s = tr(Some("fr"), "not_found.week", None);
        assert!(s.contains("Неделя"));
    }

    #[test]
    fn missing_key_returns_key() {
        let k = "non.existent.key";
        let s = t(k);
        assert_eq!(s, k.to_string());
    }
}
