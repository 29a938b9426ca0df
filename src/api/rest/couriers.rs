use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Courier, CourierStatus, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/status", patch(update_courier_status))
        .route("/couriers/:id/location", patch(update_courier_location))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub location: Option<GeoPoint>,
    pub rating: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CourierStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let now = Utc::now();
    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        status: CourierStatus::Available,
        location: payload.location,
        location_updated_at: payload.location.map(|_| now),
        rating: payload.rating.map(|r| r.clamp(0.0, 5.0)),
        completed_deliveries: 0,
        created_at: now,
    };

    state.couriers.insert(courier.id, courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

async fn update_courier_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.status = payload.status;

    Ok(Json(courier.clone()))
}

/// Location ping. Last writer wins; no ordering guarantee across delayed
/// pings.
async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    let mut courier = state
        .couriers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("courier {id} not found")))?;

    courier.location = Some(payload.location);
    courier.location_updated_at = Some(Utc::now());

    Ok(Json(courier.clone()))
}
