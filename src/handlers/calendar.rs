use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::{AppError, BookingError};
use crate::models::{BookingFilter, BookingId};
use crate::services::calendar::{generate_feed, generate_ics};
use crate::state::AppState;

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

fn stamp() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

// GET /calendar/:booking_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    // Strip .ics suffix if present
    let raw = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);
    let booking_id: BookingId = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid booking id: {raw}")))?;

    let booking = state
        .store
        .get(booking_id)
        .ok_or(AppError::Booking(BookingError::NotFound(booking_id)))?;

    let ics = generate_ics(&booking, state.store.catalog(), &stamp());
    let disposition = format!("attachment; filename=\"booking-{booking_id}.ics\"");

    Ok((
        [
            (header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    )
        .into_response())
}

// GET /calendar/feed.ics
pub async fn calendar_feed(State(state): State<Arc<AppState>>) -> Response {
    let bookings = state.store.list(&BookingFilter::default());
    let feed = generate_feed(&bookings, state.store.catalog(), &stamp());

    ([(header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE)], feed).into_response()
}
