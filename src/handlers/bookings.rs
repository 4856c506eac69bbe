use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::{AppError, BookingError, FieldErrors};
use crate::models::{Booking, BookingDraft, BookingFilter, BookingId, BookingStatus};
use crate::state::AppState;

use super::auth::check_auth;

/// Attaches the still-free slots of that day to a conflict so the caller can
/// offer alternatives.
fn into_app_error(state: &AppState, err: BookingError) -> AppError {
    if let BookingError::Conflict {
        staff_id,
        scheduled_at,
    } = &err
    {
        let (staff_id, date) = (*staff_id, scheduled_at.date());
        let alternatives = state
            .store
            .availability(date, staff_id)
            .into_iter()
            .filter(|slot| slot.available)
            .collect();
        return AppError::Conflict {
            source: err,
            alternatives,
        };
    }
    AppError::Booking(err)
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BookingFilter>,
) -> Json<Vec<Booking>> {
    Json(state.store.list(&filter))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>, AppError> {
    state
        .store
        .get(id)
        .map(Json)
        .ok_or(AppError::Booking(BookingError::NotFound(id)))
}

// POST /api/bookings/validate
pub async fn validate_booking(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<BookingDraft>,
) -> Json<FieldErrors> {
    Json(state.store.validate(&draft))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<BookingDraft>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = state
        .store
        .create(draft)
        .map_err(|e| into_app_error(&state, e))?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// PUT /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<BookingId>,
    Json(draft): Json<BookingDraft>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let booking = state
        .store
        .update(id, draft)
        .map_err(|e| into_app_error(&state, e))?;
    Ok(Json(booking))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<BookingId>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    state.store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

pub async fn transition_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<BookingId>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let to = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", body.status)))?;
    let booking = state.store.transition(id, to)?;
    Ok(Json(booking))
}
