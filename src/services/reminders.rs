use std::sync::Arc;

use chrono::Duration;
use tracing::warn;

use crate::db::{ClientRepository, ReservationRepository, WorkoutNotificationRepository};
use crate::error::AppResult;
use crate::services::localtime;
use crate::AppState;

/// Reminder kind recorded in the dedup marker table.
const FOUR_HOURS_BEFORE: &str = "4h_before";

/// Sends "your session starts soon" reminders to booked clients with linked
/// Telegram chats. Each (reservation, kind) pair fires at most once across
/// repeated scheduler runs thanks to the workout_notifications marker.
pub struct ReminderService;

impl ReminderService {
    pub async fn run_tick(state: &Arc<AppState>) {
        if let Err(e) = Self::tick(state).await {
            warn!("Reminder tick failed: {:?}", e);
        }
    }

    async fn tick(state: &Arc<AppState>) -> AppResult<()> {
        let now = localtime::now_local(state.config.schedule.utc_offset_hours);
        let upcoming =
            ReservationRepository::booked_starting_within(&state.db, now, now + Duration::hours(4))
                .await?;

        for reservation in upcoming {
            let Some(client_id) = reservation.client_id else {
                continue;
            };

            if WorkoutNotificationRepository::was_sent(
                &state.db,
                &reservation.reservation_id,
                FOUR_HOURS_BEFORE,
            )
            .await?
            {
                continue;
            }

            let Some(link) = ClientRepository::find_telegram_link(&state.db, client_id).await?
            else {
                continue;
            };

            let telegram = state.telegram.read().await;
            let Some(telegram) = telegram.as_ref() else {
                continue;
            };

            let text = crate::i18n::t_with(
                "messages.session_reminder",
                &[("time", &reservation.start_time.format("%H:%M").to_string())],
            );
            match telegram.send_message(&link.telegram_chat_id, &text).await {
                Ok(_) => {
                    WorkoutNotificationRepository::mark_sent(
                        &state.db,
                        &reservation.reservation_id,
                        FOUR_HOURS_BEFORE,
                    )
                    .await?;
                }
                Err(e) => {
                    // Not marked; the next tick retries.
                    warn!(
                        "Failed to send reminder for reservation {}: {:?}",
                        reservation.reservation_id, e
                    );
                }
            }
        }

        Ok(())
    }
}
