use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::{Client, TelegramLink};
use crate::db::ClientRepository;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", put(upsert_client))
        .route("/search", get(search_clients))
        .route("/:client_id", get(get_client))
        .route("/:client_id/telegram-link", post(link_telegram))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpsertClientRequest {
    pub id: i64,
    pub full_name: String,
    pub strava_athlete_id: Option<String>,
    pub intervals_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchClientsQuery {
    pub q: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LinkTelegramRequest {
    pub telegram_chat_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Mirror a client record from the CRM. Credentials merge with COALESCE so a
/// sync without keys never unlinks Strava/Intervals.
async fn upsert_client(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertClientRequest>,
) -> AppResult<Json<Client>> {
    let client = ClientRepository::upsert(
        &state.db,
        request.id,
        &request.full_name,
        request.strava_athlete_id.as_deref(),
        request.intervals_api_key.as_deref(),
    )
    .await?;
    Ok(Json(client))
}

async fn search_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchClientsQuery>,
) -> AppResult<Json<Vec<Client>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let clients = ClientRepository::search_by_name(&state.db, &query.q, limit).await?;
    Ok(Json(clients))
}

async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
) -> AppResult<Json<Client>> {
    ClientRepository::find_by_id(&state.db, client_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.client")))
}

async fn link_telegram(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<i64>,
    Json(request): Json<LinkTelegramRequest>,
) -> AppResult<Json<TelegramLink>> {
    ClientRepository::find_by_id(&state.db, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.client")))?;

    let link =
        ClientRepository::link_telegram(&state.db, client_id, &request.telegram_chat_id).await?;
    Ok(Json(link))
}
