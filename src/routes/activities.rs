use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::{ActivityRecord, LeaderboardRow};
use crate::db::ActivityRepository;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::reconciliation::ReconciliationDriver;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_activities))
        .route("/leaderboard", get(leaderboard))
        .route("/missing-fit", get(list_missing_fit))
        .route("/backfill", post(trigger_backfill))
        .route(
            "/:account_id/:activity_id/correct",
            post(correct_attribution),
        )
        .route("/clients/:client_id/stats", get(client_stats))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListActivitiesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub since: Option<NaiveDateTime>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MissingFitQuery {
    pub account_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BackfillQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    pub touched: u32,
}

#[derive(Debug, Deserialize)]
pub struct CorrectAttributionRequest {
    /// New client attribution; null detaches the activity from any client.
    pub client_id: Option<i64>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListActivitiesQuery>,
) -> AppResult<Json<Vec<ActivityRecord>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let activities = ActivityRepository::list_recent(&state.db, limit).await?;
    Ok(Json(activities))
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardRow>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let rows = ActivityRepository::leaderboard(&state.db, query.since, limit).await?;
    Ok(Json(rows))
}

async fn list_missing_fit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MissingFitQuery>,
) -> AppResult<Json<Vec<ActivityRecord>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let activities =
        ActivityRepository::list_missing_fit(&state.db, query.account_id.as_deref(), limit)
            .await?;
    Ok(Json(activities))
}

/// Kick a best-effort recovery pass for FIT files and unsent delivery
/// channels. Runs inline; the admin portal calls this sparingly.
async fn trigger_backfill(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BackfillQuery>,
) -> AppResult<Json<BackfillResponse>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let touched = ReconciliationDriver::run_backfill(&state, limit).await;
    Ok(Json(BackfillResponse { touched }))
}

async fn correct_attribution(
    State(state): State<Arc<AppState>>,
    Path((account_id, activity_id)): Path<(String, String)>,
    Json(request): Json<CorrectAttributionRequest>,
) -> AppResult<Json<ActivityRecord>> {
    let updated =
        ActivityRepository::set_corrected_client(&state.db, &account_id, &activity_id, request.client_id)
            .await?;
    if !updated {
        return Err(AppError::NotFound(i18n::t("not_found.activity")));
    }

    ActivityRepository::find(&state.db, &account_id, &activity_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.activity")))
}

async fn client_stats(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> AppResult<Json<LeaderboardRow>> {
    ActivityRepository::client_stats(&state.db, client_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.client")))
}
