use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::assignment::{
    self, AssignOutcome, BulkAssignReport,
};
use crate::engine::progress;
use crate::error::AppError;
use crate::fees;
use crate::geo::haversine_km;
use crate::models::assignment::Assignment;
use crate::models::courier::GeoPoint;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::order::PaymentMethod;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries", post(create_delivery).get(list_deliveries))
        .route("/deliveries/bulk-assign", post(bulk_assign))
        .route("/deliveries/:id", get(get_delivery))
        .route("/deliveries/:id/assign", post(assign))
        .route("/deliveries/:id/assign/:courier_id", post(manual_assign))
        .route("/deliveries/:id/reassign", post(reassign))
        .route("/deliveries/:id/accept", post(accept))
        .route("/deliveries/:id/pickup", post(pickup))
        .route("/deliveries/:id/transit", post(transit))
        .route("/deliveries/:id/complete", post(complete))
        .route("/deliveries/:id/cancel", post(cancel))
        .route("/deliveries/:id/fail", post(fail))
        .route("/assignments", get(list_assignments))
}

/// The "order ready" trigger. Fees are computed here, once, and persisted
/// with the delivery.
#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub pharmacy_id: Uuid,
    pub pickup: Option<GeoPoint>,
    pub dropoff: Option<GeoPoint>,
    pub subtotal: i64,
    pub payment_method: PaymentMethod,
    /// Billable distance override; derived from the coordinates when absent.
    pub distance_km: Option<f64>,
}

#[derive(Deserialize)]
pub struct ReassignRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct BulkAssignRequest {
    pub delivery_ids: Vec<Uuid>,
}

#[derive(Deserialize, Default)]
pub struct TerminateRequest {
    pub reason: Option<String>,
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> Result<Json<Delivery>, AppError> {
    if payload.subtotal <= 0 {
        return Err(AppError::InvalidAmount(payload.subtotal));
    }

    let distance_km = payload.distance_km.or_else(|| {
        match (payload.pickup.as_ref(), payload.dropoff.as_ref()) {
            (Some(pickup), Some(dropoff)) => Some(haversine_km(pickup, dropoff)),
            _ => None,
        }
    });
    let totals = fees::order_totals(
        &state.config.fees,
        payload.subtotal,
        distance_km,
        payload.payment_method,
    );

    let delivery = Delivery {
        id: Uuid::new_v4(),
        pharmacy_id: payload.pharmacy_id,
        status: DeliveryStatus::Pending,
        courier_id: None,
        pickup: payload.pickup,
        dropoff: payload.dropoff,
        distance_km,
        totals,
        payment_method: payload.payment_method,
        assigned_at: None,
        accepted_at: None,
        picked_up_at: None,
        in_transit_at: None,
        delivered_at: None,
        cancelled_at: None,
        cancel_reason: None,
        reassign_reason: None,
        created_at: Utc::now(),
    };

    state.deliveries.insert(delivery.id, delivery.clone());
    Ok(Json(delivery))
}

async fn list_deliveries(State(state): State<Arc<AppState>>) -> Json<Vec<Delivery>> {
    let deliveries = state
        .deliveries
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(deliveries)
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state
        .deliveries
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    Ok(Json(delivery.value().clone()))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>, AppError> {
    into_response(assignment::assign(&state, id)?)
}

async fn manual_assign(
    State(state): State<Arc<AppState>>,
    Path((id, courier_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Assignment>, AppError> {
    into_response(assignment::manual_assign(&state, id, courier_id)?)
}

async fn reassign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignRequest>,
) -> Result<Json<Assignment>, AppError> {
    into_response(assignment::reassign(&state, id, payload.reason)?)
}

async fn bulk_assign(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkAssignRequest>,
) -> Json<BulkAssignReport> {
    Json(assignment::bulk_assign(&state, &payload.delivery_ids))
}

fn into_response(outcome: AssignOutcome) -> Result<Json<Assignment>, AppError> {
    match outcome {
        AssignOutcome::Assigned(assignment) => Ok(Json(assignment)),
        AssignOutcome::NotEligible => Err(AppError::NotEligible(
            "delivery is not awaiting assignment".to_string(),
        )),
        AssignOutcome::NoCourierAvailable => Err(AppError::NoCourierAvailable),
    }
}

async fn accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    progress::accept(&state, id).map(Json)
}

async fn pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    progress::mark_picked_up(&state, id).map(Json)
}

async fn transit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    progress::mark_in_transit(&state, id).map(Json)
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    progress::complete(&state, id).map(Json)
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TerminateRequest>>,
) -> Result<Json<Delivery>, AppError> {
    let reason = payload.and_then(|Json(p)| p.reason);
    progress::cancel(&state, id, reason).map(Json)
}

async fn fail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TerminateRequest>>,
) -> Result<Json<Delivery>, AppError> {
    let reason = payload.and_then(|Json(p)| p.reason);
    progress::fail(&state, id, reason).map(Json)
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Assignment>> {
    let assignments = state
        .assignments
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(assignments)
}
