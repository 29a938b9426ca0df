//! Courier-facing delivery progress. Every transition goes through the
//! status table; completion settles the ledger before the delivery is
//! marked delivered.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::assignment::reconcile_courier_status;
use crate::error::AppError;
use crate::ledger::settlement;
use crate::models::delivery::{Delivery, DeliveryEvent, DeliveryStatus, next_status};
use crate::state::AppState;

/// Courier takes the job. Gated on the courier wallet being able to cover
/// the commission, checked before the transition rather than at completion.
/// Gate and transition happen under one entry guard.
pub fn accept(state: &AppState, delivery_id: Uuid) -> Result<Delivery, AppError> {
    let now = Utc::now();

    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    let Some(next) = next_status(delivery.status, DeliveryEvent::Accept) else {
        return Err(AppError::NotEligible(format!(
            "cannot accept a {:?} delivery",
            delivery.status
        )));
    };
    let courier_id = delivery
        .courier_id
        .ok_or_else(|| AppError::NotEligible("delivery has no courier".to_string()))?;

    settlement::check_commission_cover(state, courier_id)?;

    delivery.status = next;
    delivery.accepted_at = Some(now);
    Ok(delivery.clone())
}

pub fn mark_picked_up(state: &AppState, delivery_id: Uuid) -> Result<Delivery, AppError> {
    apply(state, delivery_id, DeliveryEvent::PickUp)
}

pub fn mark_in_transit(state: &AppState, delivery_id: Uuid) -> Result<Delivery, AppError> {
    apply(state, delivery_id, DeliveryEvent::StartTransit)
}

/// Terminal success. Settlement runs under the delivery's entry guard, so a
/// failed settlement leaves the delivery in transit and no wallet touched,
/// and a concurrent duplicate completion cannot settle twice.
pub fn complete(state: &AppState, delivery_id: Uuid) -> Result<Delivery, AppError> {
    let now = Utc::now();

    let (updated, courier_id) = {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        let Some(next) = next_status(delivery.status, DeliveryEvent::Complete) else {
            return Err(AppError::NotEligible(format!(
                "cannot complete a {:?} delivery",
                delivery.status
            )));
        };
        let courier_id = delivery.courier_id.ok_or_else(|| {
            AppError::Internal("in-transit delivery has no courier".to_string())
        })?;

        settlement::settle_delivery(state, &delivery, courier_id)?;

        delivery.status = next;
        delivery.delivered_at = Some(now);
        (delivery.clone(), courier_id)
    };

    if let Some(mut courier) = state.couriers.get_mut(&courier_id) {
        courier.completed_deliveries += 1;
    }
    reconcile_courier_status(state, courier_id);
    state.metrics.deliveries_active.dec();
    info!(delivery_id = %delivery_id, courier_id = %courier_id, "delivery completed");

    Ok(updated)
}

pub fn cancel(
    state: &AppState,
    delivery_id: Uuid,
    reason: Option<String>,
) -> Result<Delivery, AppError> {
    terminate(state, delivery_id, DeliveryEvent::Cancel, reason)
}

pub fn fail(
    state: &AppState,
    delivery_id: Uuid,
    reason: Option<String>,
) -> Result<Delivery, AppError> {
    terminate(state, delivery_id, DeliveryEvent::Fail, reason)
}

fn terminate(
    state: &AppState,
    delivery_id: Uuid,
    event: DeliveryEvent,
    reason: Option<String>,
) -> Result<Delivery, AppError> {
    let now = Utc::now();

    let (updated, was_active) = {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        let Some(next) = next_status(delivery.status, event) else {
            return Err(AppError::NotEligible(format!(
                "cannot {event:?} a {:?} delivery",
                delivery.status
            )));
        };

        let was_active = delivery.status.is_active();
        delivery.status = next;
        delivery.cancelled_at = Some(now);
        delivery.cancel_reason = reason;
        (delivery.clone(), was_active)
    };

    if was_active {
        // The terminated delivery no longer occupies a courier slot.
        if let Some(courier_id) = updated.courier_id {
            reconcile_courier_status(state, courier_id);
        }
        state.metrics.deliveries_active.dec();
    }
    info!(delivery_id = %delivery_id, status = ?updated.status, "delivery terminated");

    Ok(updated)
}

fn apply(state: &AppState, delivery_id: Uuid, event: DeliveryEvent) -> Result<Delivery, AppError> {
    let now = Utc::now();

    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    let Some(next) = next_status(delivery.status, event) else {
        return Err(AppError::NotEligible(format!(
            "cannot {event:?} a {:?} delivery",
            delivery.status
        )));
    };

    delivery.status = next;
    match next {
        DeliveryStatus::Accepted => delivery.accepted_at = Some(now),
        DeliveryStatus::PickedUp => delivery.picked_up_at = Some(now),
        DeliveryStatus::InTransit => delivery.in_transit_at = Some(now),
        _ => {}
    }

    Ok(delivery.clone())
}
