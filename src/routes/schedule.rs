use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::db::models::{
    CopySeatingOutcome, CreateSlot, CreateStand, Reservation, ReservationStatus, SessionKind,
    Slot, Stand, UpdateReservation, Week,
};
use crate::db::{
    ReservationRepository, SlotRepository, StandRepository, WeekRepository,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/weeks", post(get_or_create_week).get(list_weeks))
        .route("/weeks/:week_id", delete(delete_week))
        .route("/weeks/:week_id/slots", get(list_week_slots))
        .route("/weeks/:week_id/default-slots", post(seed_default_slots))
        .route(
            "/weeks/:week_id/copy-from/:source_week_id",
            post(copy_week),
        )
        .route("/weeks/:week_id/sync-capacity", post(sync_week_capacity))
        .route("/slots", post(create_slot))
        .route("/slots/:slot_id", delete(delete_slot))
        .route("/slots/:slot_id/cancel", post(cancel_slot))
        .route("/slots/:slot_id/clear", post(clear_slot))
        .route("/slots/:slot_id/reservations", get(list_slot_reservations))
        .route(
            "/slots/:target_slot_id/copy-seating/:source_slot_id",
            post(copy_seating),
        )
        .route("/reservations/:reservation_id/book", post(book_reservation))
        .route(
            "/reservations/:reservation_id/clear",
            post(clear_reservation),
        )
        .route(
            "/reservations/:reservation_id",
            patch(update_reservation).delete(delete_reservation),
        )
        .route("/stands", post(create_stand).get(list_stands))
        .route("/stands/:stand_id/active", patch(set_stand_active))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GetOrCreateWeekRequest {
    /// Any date inside the week; normalized to its Monday.
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListWeeksQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDefaultSlotsQuery {
    pub force: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SlotsCreatedResponse {
    pub created: i64,
}

#[derive(Debug, Serialize)]
pub struct CopyWeekResponse {
    pub slots_copied: i64,
    pub placeholders_created: i64,
}

#[derive(Debug, Serialize)]
pub struct CapacityResponse {
    pub placeholders_created: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub week_id: String,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub session_kind: Option<SessionKind>,
    pub instructor_name: Option<String>,
    pub label: Option<String>,
    pub notes: Option<String>,
    pub sort_index: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateSlotResponse {
    pub slot: Slot,
    pub placeholders_created: i64,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: i64,
}

#[derive(Debug, Deserialize)]
pub struct BookReservationRequest {
    pub client_id: i64,
    pub client_name: String,
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReservationRequest {
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub status: Option<ReservationStatus>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStandActiveRequest {
    pub is_active: bool,
}

// ============================================================================
// Week Handlers
// ============================================================================

async fn get_or_create_week(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GetOrCreateWeekRequest>,
) -> AppResult<Json<Week>> {
    let week = WeekRepository::get_or_create(&state.db, request.date).await?;
    Ok(Json(week))
}

async fn list_weeks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListWeeksQuery>,
) -> AppResult<Json<Vec<Week>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let weeks = WeekRepository::list(&state.db, limit).await?;
    Ok(Json(weeks))
}

async fn delete_week(
    State(state): State<Arc<AppState>>,
    Path(week_id): Path<String>,
) -> AppResult<StatusCode> {
    if WeekRepository::delete(&state.db, &week_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(i18n::t("not_found.week")))
    }
}

async fn list_week_slots(
    State(state): State<Arc<AppState>>,
    Path(week_id): Path<String>,
) -> AppResult<Json<Vec<Slot>>> {
    WeekRepository::find_by_id(&state.db, &week_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))?;

    let slots = SlotRepository::list_for_week(&state.db, &week_id).await?;
    Ok(Json(slots))
}

async fn seed_default_slots(
    State(state): State<Arc<AppState>>,
    Path(week_id): Path<String>,
    Query(query): Query<SeedDefaultSlotsQuery>,
) -> AppResult<Json<SlotsCreatedResponse>> {
    let created =
        SlotRepository::create_default_slots(&state.db, &week_id, query.force.unwrap_or(false))
            .await?;
    Ok(Json(SlotsCreatedResponse { created }))
}

async fn copy_week(
    State(state): State<Arc<AppState>>,
    Path((week_id, source_week_id)): Path<(String, String)>,
) -> AppResult<Json<CopyWeekResponse>> {
    let (slots_copied, placeholders_created) =
        SlotRepository::copy_from_week(&state.db, &source_week_id, &week_id).await?;
    Ok(Json(CopyWeekResponse {
        slots_copied,
        placeholders_created,
    }))
}

async fn sync_week_capacity(
    State(state): State<Arc<AppState>>,
    Path(week_id): Path<String>,
) -> AppResult<Json<CapacityResponse>> {
    WeekRepository::find_by_id(&state.db, &week_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.week")))?;

    let placeholders_created =
        ReservationRepository::sync_week_capacity(&state.db, &week_id).await?;
    Ok(Json(CapacityResponse {
        placeholders_created,
    }))
}

// ============================================================================
// Slot Handlers
// ============================================================================

async fn create_slot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSlotRequest>,
) -> AppResult<(StatusCode, Json<CreateSlotResponse>)> {
    let (slot, placeholders_created) = SlotRepository::create(
        &state.db,
        CreateSlot {
            week_id: request.week_id,
            slot_date: request.slot_date,
            start_time: request.start_time,
            end_time: request.end_time,
            session_kind: request.session_kind,
            instructor_name: request.instructor_name,
            label: request.label,
            notes: request.notes,
            sort_index: request.sort_index,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSlotResponse {
            slot,
            placeholders_created,
        }),
    ))
}

async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> AppResult<StatusCode> {
    if SlotRepository::delete(&state.db, &slot_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(i18n::t("not_found.slot")))
    }
}

async fn cancel_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> AppResult<StatusCode> {
    if SlotRepository::set_cancelled(&state.db, &slot_id, true).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(i18n::t("not_found.slot")))
    }
}

async fn clear_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> AppResult<Json<ClearedResponse>> {
    SlotRepository::find_by_id(&state.db, &slot_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.slot")))?;

    let cleared = ReservationRepository::clear_for_slot(&state.db, &slot_id).await?;
    Ok(Json(ClearedResponse { cleared }))
}

async fn list_slot_reservations(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> AppResult<Json<Vec<Reservation>>> {
    SlotRepository::find_by_id(&state.db, &slot_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.slot")))?;

    let reservations = ReservationRepository::list_for_slot(&state.db, &slot_id).await?;
    Ok(Json(reservations))
}

async fn copy_seating(
    State(state): State<Arc<AppState>>,
    Path((target_slot_id, source_slot_id)): Path<(String, String)>,
) -> AppResult<Json<CopySeatingOutcome>> {
    let outcome =
        ReservationRepository::copy_slot_seating(&state.db, &source_slot_id, &target_slot_id)
            .await?;
    Ok(Json(outcome))
}

// ============================================================================
// Reservation Handlers
// ============================================================================

async fn book_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
    Json(request): Json<BookReservationRequest>,
) -> AppResult<Json<Reservation>> {
    let booked = ReservationRepository::book_available(
        &state.db,
        &reservation_id,
        request.client_id,
        &request.client_name,
        request.source.as_deref(),
        request.notes.as_deref(),
    )
    .await?;

    match booked {
        Some(reservation) => Ok(Json(reservation)),
        None => {
            // Distinguish "never existed" from "someone else won the race".
            match ReservationRepository::find_by_id(&state.db, &reservation_id).await? {
                Some(_) => Err(AppError::Conflict(i18n::t("conflict.stand_taken"))),
                None => Err(AppError::NotFound(i18n::t("not_found.reservation"))),
            }
        }
    }
}

async fn clear_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
) -> AppResult<Json<Reservation>> {
    ReservationRepository::clear(&state.db, &reservation_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.reservation")))
}

async fn update_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
    Json(request): Json<UpdateReservationRequest>,
) -> AppResult<Json<Reservation>> {
    let updated = ReservationRepository::update(
        &state.db,
        &reservation_id,
        UpdateReservation {
            client_id: request.client_id,
            client_name: request.client_name,
            status: request.status,
            source: request.source,
            notes: request.notes,
        },
    )
    .await?;
    Ok(Json(updated))
}

async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
) -> AppResult<StatusCode> {
    if ReservationRepository::delete(&state.db, &reservation_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(i18n::t("not_found.reservation")))
    }
}

// ============================================================================
// Stand Handlers
// ============================================================================

async fn create_stand(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateStand>,
) -> AppResult<(StatusCode, Json<Stand>)> {
    let stand = StandRepository::create(&state.db, request).await?;
    Ok((StatusCode::CREATED, Json(stand)))
}

async fn list_stands(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Stand>>> {
    let stands = StandRepository::list_active(&state.db).await?;
    Ok(Json(stands))
}

async fn set_stand_active(
    State(state): State<Arc<AppState>>,
    Path(stand_id): Path<i64>,
    Json(request): Json<SetStandActiveRequest>,
) -> AppResult<StatusCode> {
    if StandRepository::set_active(&state.db, stand_id, request.is_active).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Stand {} not found", stand_id)))
    }
}
