pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod catalog;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/services", get(catalog::list_services))
        .route("/api/staff", get(catalog::list_staff))
        .route("/api/availability", get(catalog::get_availability))
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/validate", post(bookings::validate_booking))
        .route(
            "/api/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/status",
            post(bookings::transition_status),
        )
        .route("/api/events", get(events::events_stream))
        .route("/calendar/feed.ics", get(calendar::calendar_feed))
        .route(
            "/calendar/:booking_id",
            get(calendar::download_ics),
        )
        .with_state(state)
}
