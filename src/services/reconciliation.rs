use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::config::WattAttackAccount;
use crate::db::models::NewActivityRecord;
use crate::db::{ActivityRepository, ClientRepository, ReservationRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::localtime;
use crate::services::matcher;
use crate::services::wattattack::ActivitySummary;
use crate::AppState;

/// Reconciliation driver: for each configured WattAttack account, poll the
/// activity feed, attribute new activities to scheduled clients, archive FIT
/// exports and fan delivery out to the client bot / Strava / Intervals.icu.
///
/// The loop is safe to run repeatedly: the ledger's `was_seen` check
/// short-circuits known activities before any expensive work, the FIT
/// archive skips existing files, and delivery flags are OR-merged so a retry
/// after partial failure never re-sends a channel that already succeeded.
pub struct ReconciliationDriver;

/// Per-channel outcome of one delivery fan-out.
#[derive(Debug, Clone, Copy, Default)]
struct DeliveryFlags {
    clientbot: bool,
    strava: bool,
    intervals: bool,
}

impl ReconciliationDriver {
    /// One tick: process every configured account sequentially. A login or
    /// feed failure aborts that account only.
    pub async fn run_tick(state: &Arc<AppState>) {
        for account in &state.config.wattattack.accounts {
            match Self::process_account(state, account).await {
                Ok(processed) => {
                    if processed > 0 {
                        info!(
                            "Processed {} new activities for account {}",
                            processed, account.account_id
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to process account {}: {:?}",
                        account.account_id, e
                    );
                }
            }
        }
    }

    async fn process_account(
        state: &Arc<AppState>,
        account: &WattAttackAccount,
    ) -> AppResult<u32> {
        let token = state
            .wattattack
            .login(&account.email, &account.password)
            .await?;
        let feed = state.wattattack.fetch_activities(&token).await?;

        let mut processed = 0u32;
        for summary in feed {
            if ActivityRepository::was_seen(&state.db, &account.account_id, &summary.id).await? {
                continue;
            }

            match Self::process_activity(state, account, &token, &summary).await {
                Ok(true) => processed += 1,
                Ok(false) => {
                    // Deferred: no FIT yet and still inside the wait window.
                }
                Err(e) => {
                    warn!(
                        "Failed to process activity {} on account {}: {:?}",
                        summary.id, account.account_id, e
                    );
                }
            }
        }

        Ok(processed)
    }

    /// Process one previously unseen activity. Returns false when the
    /// activity is deferred (not recorded) to give the FIT export time to
    /// appear.
    async fn process_activity(
        state: &Arc<AppState>,
        account: &WattAttackAccount,
        token: &str,
        summary: &ActivitySummary,
    ) -> AppResult<bool> {
        let started_utc: DateTime<Utc> = DateTime::parse_from_rfc3339(&summary.start_time)
            .map_err(|e| {
                AppError::WattAttack(format!(
                    "Malformed startTime '{}': {}",
                    summary.start_time, e
                ))
            })?
            .with_timezone(&Utc);

        if summary.fit_file_id.is_none() {
            let age = Utc::now() - started_utc;
            if age < Duration::seconds(state.config.schedule.fit_wait_seconds) {
                return Ok(false);
            }
        }

        let offset = state.config.schedule.utc_offset_hours;
        let started_local = localtime::utc_to_local(started_utc, offset);

        let candidates =
            ReservationRepository::booked_on_date(&state.db, started_local.date()).await?;
        let matched = matcher::match_activity(
            &candidates,
            &account.stand_ids,
            started_local,
            summary.athlete_name.as_deref(),
            state.config.schedule.grace_minutes,
        );

        let client_id = matched.as_ref().and_then(|m| m.reservation.client_id);
        let scheduled_name = matched
            .as_ref()
            .and_then(|m| m.reservation.client_name.clone());

        let fit_path = match &summary.fit_file_id {
            Some(fit_file_id) => {
                match Self::archive_fit(state, token, &account.account_id, &summary.id, fit_file_id)
                    .await
                {
                    Ok(path) => Some(path),
                    Err(e) => {
                        // Recorded without fit_path; the backfill path retries.
                        warn!(
                            "Failed to archive FIT for activity {}: {:?}",
                            summary.id, e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let flags = match client_id {
            Some(client_id) => {
                Self::deliver(
                    state,
                    client_id,
                    summary,
                    started_local,
                    fit_path.as_deref(),
                    DeliveryFlags::default(),
                )
                .await
            }
            None => {
                Self::notify_admin_unmatched(state, account, &summary.id).await;
                DeliveryFlags::default()
            }
        };

        ActivityRepository::record_seen(
            &state.db,
            NewActivityRecord {
                account_id: account.account_id.clone(),
                activity_id: summary.id.clone(),
                client_id,
                scheduled_name,
                profile_name: summary.athlete_name.clone(),
                start_time: Some(started_local),
                sent_clientbot: flags.clientbot,
                sent_strava: flags.strava,
                sent_intervals: flags.intervals,
                distance_m: summary.distance,
                elapsed_seconds: summary.elapsed_time,
                elevation_gain_m: summary.elevation_gain,
                avg_power: summary.avg_power,
                avg_cadence: summary.avg_cadence,
                avg_heart_rate: summary.avg_heart_rate,
                fit_path: fit_path.map(|p| p.to_string_lossy().into_owned()),
            },
        )
        .await?;

        Ok(true)
    }

    fn fit_destination(state: &AppState, account_id: &str, activity_id: &str) -> PathBuf {
        Path::new(&state.config.schedule.fit_dir)
            .join(account_id)
            .join(format!("{}.fit", activity_id))
    }

    /// Download the FIT export into the per-account archive directory.
    /// Skips the download when the destination file already exists.
    async fn archive_fit(
        state: &Arc<AppState>,
        token: &str,
        account_id: &str,
        activity_id: &str,
        fit_file_id: &str,
    ) -> AppResult<PathBuf> {
        let dest = Self::fit_destination(state, account_id, activity_id);

        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Ok(dest);
        }

        let bytes = state.wattattack.download_fit(token, fit_file_id).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(e.into()))?;
        }
        tokio::fs::write(&dest, bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(dest)
    }

    /// Fan delivery out to the three channels. Channels whose `prior` flag is
    /// already set are skipped; each channel's failure is caught and logged
    /// independently so one channel never blocks the others.
    async fn deliver(
        state: &Arc<AppState>,
        client_id: i64,
        summary: &ActivitySummary,
        started_local: NaiveDateTime,
        fit_path: Option<&Path>,
        prior: DeliveryFlags,
    ) -> DeliveryFlags {
        let mut flags = prior;

        let client = match ClientRepository::find_by_id(&state.db, client_id).await {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to load client {}: {:?}", client_id, e);
                return flags;
            }
        };

        // Telegram client bot: document when the FIT is archived, text otherwise.
        if !flags.clientbot {
            match ClientRepository::find_telegram_link(&state.db, client_id).await {
                Ok(Some(link)) => {
                    let telegram = state.telegram.read().await;
                    if let Some(telegram) = telegram.as_ref() {
                        let report = format_workout_report(summary, started_local);
                        let result = match fit_path {
                            Some(path) => {
                                telegram
                                    .send_document(&link.telegram_chat_id, path, Some(&report))
                                    .await
                            }
                            None => telegram.send_message(&link.telegram_chat_id, &report).await,
                        };
                        match result {
                            Ok(_) => flags.clientbot = true,
                            Err(e) => warn!(
                                "Client bot delivery failed for client {}: {:?}",
                                client_id, e
                            ),
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Failed to resolve Telegram link for client {}: {:?}",
                    client_id, e
                ),
            }
        }

        // Strava, via the brokering service. Requires an archived file.
        if !flags.strava {
            if let (Some(broker), Some(path)) = (state.strava.as_ref(), fit_path) {
                match broker.is_connected(client_id).await {
                    Ok(true) => match tokio::fs::read(path).await {
                        Ok(bytes) => {
                            let name = summary.name.clone().unwrap_or_else(|| {
                                format!("Тренировка {}", started_local.format("%d.%m.%Y"))
                            });
                            match broker
                                .upload_activity(client_id, bytes, &name, &i18n::t("app.name"))
                                .await
                            {
                                Ok(_) => flags.strava = true,
                                Err(e) => warn!(
                                    "Strava upload failed for client {}: {:?}",
                                    client_id, e
                                ),
                            }
                        }
                        Err(e) => warn!("Failed to read archived FIT {:?}: {}", path, e),
                    },
                    Ok(false) => {}
                    Err(e) => warn!(
                        "Strava status check failed for client {}: {:?}",
                        client_id, e
                    ),
                }
            }
        }

        // Intervals.icu, using the client's own API key. Requires an archived file.
        if !flags.intervals {
            if let (Some(client), Some(path)) = (client.as_ref(), fit_path) {
                if let Some(api_key) = client.intervals_api_key.as_deref() {
                    match tokio::fs::read(path).await {
                        Ok(bytes) => {
                            let name = summary.name.clone().unwrap_or_else(|| {
                                format!("Тренировка {}", started_local.format("%d.%m.%Y"))
                            });
                            match state.intervals.upload_activity(api_key, bytes, &name).await {
                                Ok(_) => flags.intervals = true,
                                Err(e) => warn!(
                                    "Intervals upload failed for client {}: {:?}",
                                    client_id, e
                                ),
                            }
                        }
                        Err(e) => warn!("Failed to read archived FIT {:?}: {}", path, e),
                    }
                }
            }
        }

        flags
    }

    async fn notify_admin_unmatched(
        state: &Arc<AppState>,
        account: &WattAttackAccount,
        activity_id: &str,
    ) {
        let Some(admin_chat_id) = state.config.telegram.admin_chat_id.as_deref() else {
            return;
        };

        let telegram = state.telegram.read().await;
        if let Some(telegram) = telegram.as_ref() {
            let text = i18n::t_with(
                "messages.unmatched_activity",
                &[
                    ("activity", activity_id),
                    ("account", &account.account_id),
                ],
            );
            if let Err(e) = telegram.send_message(admin_chat_id, &text).await {
                warn!("Failed to notify admin about unmatched activity: {:?}", e);
            }
        }
    }

    /// Best-effort recovery pass over already-recorded activities: re-fetch
    /// each account's feed, download FIT exports that were missing when the
    /// activity was first recorded, and re-attempt delivery channels whose
    /// flag is still unset. Channels that already succeeded are skipped via
    /// the fetched `sent_*` flags. Returns the number of rows touched.
    pub async fn run_backfill(state: &Arc<AppState>, limit: i64) -> u32 {
        let mut touched = 0u32;
        for account in &state.config.wattattack.accounts {
            match Self::backfill_account(state, account, limit).await {
                Ok(n) => touched += n,
                Err(e) => warn!(
                    "Backfill failed for account {}: {:?}",
                    account.account_id, e
                ),
            }
        }
        touched
    }

    async fn backfill_account(
        state: &Arc<AppState>,
        account: &WattAttackAccount,
        limit: i64,
    ) -> AppResult<u32> {
        let missing =
            ActivityRepository::list_missing_fit(&state.db, Some(&account.account_id), limit)
                .await?;
        if missing.is_empty() {
            return Ok(0);
        }

        let token = state
            .wattattack
            .login(&account.email, &account.password)
            .await?;
        let feed = state.wattattack.fetch_activities(&token).await?;

        let mut touched = 0u32;
        for record in missing {
            let Some(summary) = feed.iter().find(|s| s.id == record.activity_id) else {
                continue;
            };
            let Some(fit_file_id) = summary.fit_file_id.as_deref() else {
                // Export still not ready; try again on a later pass.
                continue;
            };

            let fit_path = match Self::archive_fit(
                state,
                &token,
                &account.account_id,
                &record.activity_id,
                fit_file_id,
            )
            .await
            {
                Ok(path) => path,
                Err(e) => {
                    warn!(
                        "Backfill FIT archive failed for activity {}: {:?}",
                        record.activity_id, e
                    );
                    continue;
                }
            };

            let prior = DeliveryFlags {
                clientbot: record.sent_clientbot,
                strava: record.sent_strava,
                intervals: record.sent_intervals,
            };
            let started_local = record.start_time.unwrap_or_else(|| {
                localtime::now_local(state.config.schedule.utc_offset_hours)
            });

            let flags = match record.effective_client_id() {
                Some(client_id) => {
                    Self::deliver(
                        state,
                        client_id,
                        summary,
                        started_local,
                        Some(&fit_path),
                        prior,
                    )
                    .await
                }
                None => prior,
            };

            ActivityRepository::record_seen(
                &state.db,
                NewActivityRecord {
                    account_id: account.account_id.clone(),
                    activity_id: record.activity_id.clone(),
                    client_id: None,
                    scheduled_name: None,
                    profile_name: None,
                    start_time: None,
                    sent_clientbot: flags.clientbot,
                    sent_strava: flags.strava,
                    sent_intervals: flags.intervals,
                    distance_m: summary.distance,
                    elapsed_seconds: summary.elapsed_time,
                    elevation_gain_m: summary.elevation_gain,
                    avg_power: summary.avg_power,
                    avg_cadence: summary.avg_cadence,
                    avg_heart_rate: summary.avg_heart_rate,
                    fit_path: Some(fit_path.to_string_lossy().into_owned()),
                },
            )
            .await?;

            touched += 1;
        }

        Ok(touched)
    }
}

/// Render the client-facing workout summary message.
fn format_workout_report(summary: &ActivitySummary, started_local: NaiveDateTime) -> String {
    let date = started_local.format("%d.%m.%Y").to_string();

    let distance = summary
        .distance
        .map(|m| format!("{:.1}", m / 1000.0))
        .unwrap_or_else(|| "—".to_string());
    let duration = summary
        .elapsed_time
        .map(|secs| format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60))
        .unwrap_or_else(|| "—".to_string());
    let elevation = summary
        .elevation_gain
        .map(|m| format!("{:.0}", m))
        .unwrap_or_else(|| "—".to_string());
    let power = summary
        .avg_power
        .map(|w| format!("{:.0}", w))
        .unwrap_or_else(|| "—".to_string());
    let heart_rate = summary
        .avg_heart_rate
        .map(|bpm| format!("{:.0}", bpm))
        .unwrap_or_else(|| "—".to_string());

    i18n::t_with(
        "messages.workout_report",
        &[
            ("date", &date),
            ("distance", &distance),
            ("duration", &duration),
            ("elevation", &elevation),
            ("power", &power),
            ("heart_rate", &heart_rate),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(distance: Option<f64>, elapsed: Option<i64>) -> ActivitySummary {
        ActivitySummary {
            id: "act-1".to_string(),
            name: None,
            start_time: "2024-03-01T07:05:00Z".to_string(),
            distance,
            elapsed_time: elapsed,
            elevation_gain: Some(120.0),
            avg_power: Some(183.4),
            avg_cadence: Some(88.0),
            avg_heart_rate: Some(142.6),
            fit_file_id: None,
            athlete_name: None,
        }
    }

    #[test]
    fn report_formats_metrics() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 5, 0)
            .unwrap();
        let report = format_workout_report(&summary(Some(32_400.0), Some(7_140)), at);
        assert!(report.contains("01.03.2024"));
        assert!(report.contains("32.4"));
        assert!(report.contains("1:59:00"));
        assert!(report.contains("183"));
    }

    #[test]
    fn report_uses_dashes_for_missing_metrics() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 5, 0)
            .unwrap();
        let report = format_workout_report(&summary(None, None), at);
        assert!(report.contains("—"));
    }
}
