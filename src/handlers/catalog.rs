use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Service, ServiceId, Staff, StaffId, TimeSlot};
use crate::state::AppState;

// GET /api/services
pub async fn list_services(State(state): State<Arc<AppState>>) -> Json<Vec<Service>> {
    Json(state.store.catalog().list_services())
}

// GET /api/staff
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffQuery {
    pub service_id: Option<ServiceId>,
}

pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StaffQuery>,
) -> Json<Vec<Staff>> {
    Json(state.store.catalog().list_staff(query.service_id))
}

// GET /api/availability
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub staff_id: StaffId,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    if state.store.catalog().staff(query.staff_id).is_none() {
        return Err(AppError::NotFound(format!("staff {}", query.staff_id)));
    }
    Ok(Json(state.store.availability(query.date, query.staff_id)))
}
