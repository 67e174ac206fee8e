use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::WattAttackAccount;
use crate::db::models::BookedReservation;
use crate::db::{AssignmentRepository, ReservationRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::localtime;
use crate::services::wattattack::ProfileUpdate;
use crate::AppState;

/// In-memory dedup for admin assignment notifications, scoped to the process
/// lifetime. Prevents re-announcing the same (reservation, account, status)
/// on every tick while the reservation sits inside the lookahead window.
#[derive(Debug, Default)]
pub struct AssignmentNotificationCache {
    sent: Mutex<HashSet<(String, String, String)>>,
}

impl AssignmentNotificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this key was not announced before (and records it).
    pub async fn first_time(&self, reservation_id: &str, account_id: &str, status: &str) -> bool {
        let mut sent = self.sent.lock().await;
        sent.insert((
            reservation_id.to_string(),
            account_id.to_string(),
            status.to_string(),
        ))
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

/// Auto-assignment loop: ahead of a reservation's scheduled start, push the
/// booked client's name into the WattAttack account parked at the
/// reservation's stand, so the rider's session is pre-configured.
///
/// Idempotency is two-layered: the persistent assignment marker guarantees a
/// profile is pushed at most once per (reservation, account), and the
/// in-memory cache keeps observe-mode ticks from re-announcing the same
/// upcoming assignment.
pub struct AutoAssignmentLoop;

impl AutoAssignmentLoop {
    pub async fn run_tick(state: &Arc<AppState>, cache: &AssignmentNotificationCache) {
        if let Err(e) = Self::tick(state, cache).await {
            warn!("Auto-assignment tick failed: {:?}", e);
        }
    }

    async fn tick(state: &Arc<AppState>, cache: &AssignmentNotificationCache) -> AppResult<()> {
        let accounts_by_stand = stand_account_map(&state.config.wattattack.accounts);
        if accounts_by_stand.is_empty() {
            return Ok(());
        }

        let observe_only = state.config.schedule.assignment_observe_only;
        let now = localtime::now_local(state.config.schedule.utc_offset_hours);
        let from = now + Duration::minutes(state.config.schedule.assignment_lead_minutes);
        let to = from + Duration::minutes(state.config.schedule.assignment_window_minutes);

        let upcoming = ReservationRepository::booked_starting_within(&state.db, from, to).await?;

        let mut lines: Vec<String> = Vec::new();
        for reservation in &upcoming {
            let Some(stand_id) = reservation.stand_id else {
                continue;
            };
            let Some(account) = accounts_by_stand.get(&stand_id) else {
                continue;
            };

            if AssignmentRepository::was_applied(
                &state.db,
                &reservation.reservation_id,
                &account.account_id,
            )
            .await?
            {
                continue;
            }

            let status = if observe_only { "observed" } else { "applied" };
            if !cache
                .first_time(&reservation.reservation_id, &account.account_id, status)
                .await
            {
                continue;
            }

            if !observe_only {
                match Self::apply_profile(state, account, reservation).await {
                    Ok(()) => {
                        AssignmentRepository::record_applied(
                            &state.db,
                            &reservation.reservation_id,
                            &account.account_id,
                            reservation.client_id,
                        )
                        .await?;
                        info!(
                            "Applied profile of client {:?} to account {} (stand {})",
                            reservation.client_id, account.account_id, stand_id
                        );
                    }
                    Err(e) => {
                        // No marker: the next tick retries.
                        warn!(
                            "Failed to apply profile to account {} for reservation {}: {:?}",
                            account.account_id, reservation.reservation_id, e
                        );
                        continue;
                    }
                }
            }

            let client = reservation.client_name.clone().unwrap_or_default();
            let time = reservation.start_time.format("%H:%M").to_string();
            lines.push(i18n::t_with(
                "messages.assignment_line",
                &[
                    ("client", client.as_str()),
                    ("stand", &stand_id.to_string()),
                    ("time", &time),
                ],
            ));
        }

        if !lines.is_empty() {
            Self::notify_admin(state, &lines, observe_only).await;
        }

        Ok(())
    }

    /// Push the scheduled client's name into the platform account profile.
    async fn apply_profile(
        state: &Arc<AppState>,
        account: &WattAttackAccount,
        reservation: &BookedReservation,
    ) -> AppResult<()> {
        let client_name = reservation
            .client_name
            .as_deref()
            .ok_or_else(|| AppError::Validation("Reservation has no client name".to_string()))?;

        let mut parts = client_name.split_whitespace();
        let first_name = parts.next().unwrap_or(client_name).to_string();
        let last_name = parts.collect::<Vec<_>>().join(" ");

        let token = state
            .wattattack
            .login(&account.email, &account.password)
            .await?;
        state
            .wattattack
            .update_profile(
                token.as_str(),
                &ProfileUpdate {
                    first_name: Some(first_name),
                    last_name: Some(last_name).filter(|s| !s.is_empty()),
                    ..Default::default()
                },
            )
            .await
    }

    /// All assignments due in the same tick go out as a single admin message.
    async fn notify_admin(state: &Arc<AppState>, lines: &[String], observe_only: bool) {
        let Some(admin_chat_id) = state.config.telegram.admin_chat_id.as_deref() else {
            return;
        };

        let telegram = state.telegram.read().await;
        if let Some(telegram) = telegram.as_ref() {
            let mut text = format!(
                "{}\n{}",
                i18n::t("messages.assignments_header"),
                lines.join("\n")
            );
            if observe_only {
                text.push('\n');
                text.push_str(&i18n::t("messages.assignment_observe_suffix"));
            }
            if let Err(e) = telegram.send_message(admin_chat_id, &text).await {
                warn!("Failed to send assignment notification: {:?}", e);
            }
        }
    }
}

fn stand_account_map(accounts: &[WattAttackAccount]) -> HashMap<i64, &WattAttackAccount> {
    let mut map = HashMap::new();
    for account in accounts {
        for &stand_id in &account.stand_ids {
            map.insert(stand_id, account);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, stands: &[i64]) -> WattAttackAccount {
        WattAttackAccount {
            account_id: id.to_string(),
            email: format!("{}@example.com", id),
            password: "secret".to_string(),
            stand_ids: stands.to_vec(),
        }
    }

    #[test]
    fn stand_map_flattens_multi_stand_accounts() {
        let accounts = vec![account("alice", &[5, 6]), account("bob", &[7])];
        let map = stand_account_map(&accounts);
        assert_eq!(map.get(&5).unwrap().account_id, "alice");
        assert_eq!(map.get(&6).unwrap().account_id, "alice");
        assert_eq!(map.get(&7).unwrap().account_id, "bob");
        assert!(!map.contains_key(&8));
    }

    #[tokio::test]
    async fn notification_cache_dedups_until_cleared() {
        let cache = AssignmentNotificationCache::new();
        assert!(cache.first_time("r1", "alice", "observed").await);
        assert!(!cache.first_time("r1", "alice", "observed").await);
        // A different status is a different announcement.
        assert!(cache.first_time("r1", "alice", "applied").await);

        cache.clear().await;
        assert!(cache.first_time("r1", "alice", "observed").await);
    }
}
