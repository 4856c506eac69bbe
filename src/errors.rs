use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{BookingId, BookingStatus, StaffId, TimeSlot};

/// Field name to message. Empty means the draft passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first message for a field; later ones are dropped.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("booking {0} not found")]
    NotFound(BookingId),

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("staff {staff_id} is already booked at {scheduled_at}")]
    Conflict {
        staff_id: StaffId,
        scheduled_at: NaiveDateTime,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    /// Slot conflict with the remaining free slots of that day attached.
    #[error("{source}")]
    Conflict {
        source: BookingError,
        alternatives: Vec<TimeSlot>,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Booking(BookingError::Validation(fields)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "error": "validation failed", "kind": "validation", "fields": fields }),
            ),
            AppError::Booking(BookingError::NotFound(_)) | AppError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": self.to_string(), "kind": "not_found" }),
            ),
            AppError::Booking(BookingError::InvalidTransition { from, to }) => (
                StatusCode::CONFLICT,
                serde_json::json!({
                    "error": self.to_string(),
                    "kind": "invalid_transition",
                    "from": from,
                    "to": to,
                }),
            ),
            AppError::Booking(BookingError::Conflict { .. }) => (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": self.to_string(), "kind": "conflict", "alternatives": [] }),
            ),
            AppError::Conflict { alternatives, .. } => (
                StatusCode::CONFLICT,
                serde_json::json!({
                    "error": self.to_string(),
                    "kind": "conflict",
                    "alternatives": alternatives,
                }),
            ),
            AppError::Booking(BookingError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.to_string(), "kind": "internal" }),
            ),
            AppError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": self.to_string(), "kind": "bad_request" }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "unauthorized" }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
