use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::filter::eligible_candidates;
use crate::engine::scoring::pick_best;
use crate::error::AppError;
use crate::models::assignment::{Assignment, ScoreBreakdown};
use crate::models::courier::CourierStatus;
use crate::models::delivery::{DeliveryEvent, next_status};
use crate::state::AppState;

/// Expected results of an assignment attempt. Only storage-level problems
/// surface as errors; these are outcomes a caller branches on.
#[derive(Debug, Clone)]
pub enum AssignOutcome {
    Assigned(Assignment),
    /// The delivery is not awaiting assignment; nothing to do.
    NotEligible,
    /// The filtered pool was empty; the delivery stays pending.
    NoCourierAvailable,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct BulkAssignReport {
    pub assigned: usize,
    pub no_courier: usize,
    pub not_eligible: usize,
    pub not_found: usize,
}

/// Match a pending delivery to the best available courier.
pub fn assign(state: &AppState, delivery_id: Uuid) -> Result<AssignOutcome, AppError> {
    assign_excluding(state, delivery_id, None)
}

fn assign_excluding(
    state: &AppState,
    delivery_id: Uuid,
    exclude: Option<Uuid>,
) -> Result<AssignOutcome, AppError> {
    let pickup = {
        let delivery = state
            .deliveries
            .get(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        if delivery.courier_id.is_some()
            || next_status(delivery.status, DeliveryEvent::Assign).is_none()
        {
            return Ok(AssignOutcome::NotEligible);
        }
        delivery.pickup
    };

    let candidates = eligible_candidates(state, pickup.as_ref(), exclude);
    let now = Utc::now();

    let Some((winner, score, breakdown)) = pick_best(&candidates, now, &state.config.dispatch)
    else {
        state
            .metrics
            .assignments_total
            .with_label_values(&["no_courier"])
            .inc();
        info!(delivery_id = %delivery_id, "no courier available");
        return Ok(AssignOutcome::NoCourierAvailable);
    };

    // Commit under the entry guard. The status is re-checked here so that of
    // two concurrent assigns, the loser observes the transition and reports
    // not-eligible instead of double-booking.
    {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        if delivery.courier_id.is_some() {
            return Ok(AssignOutcome::NotEligible);
        }
        let Some(next) = next_status(delivery.status, DeliveryEvent::Assign) else {
            return Ok(AssignOutcome::NotEligible);
        };

        delivery.status = next;
        delivery.courier_id = Some(winner.courier.id);
        delivery.assigned_at = Some(now);
    }

    reconcile_courier_status(state, winner.courier.id);
    state.metrics.deliveries_active.inc();

    let assignment = Assignment {
        id: Uuid::new_v4(),
        delivery_id,
        courier_id: winner.courier.id,
        score,
        score_breakdown: breakdown,
        manual: false,
        assigned_at: now,
    };
    record_assignment(state, &assignment, "assigned");

    Ok(AssignOutcome::Assigned(assignment))
}

/// Operator override: caller supplies the courier and skips filter and
/// scoring entirely. Capacity bookkeeping still applies.
pub fn manual_assign(
    state: &AppState,
    delivery_id: Uuid,
    courier_id: Uuid,
) -> Result<AssignOutcome, AppError> {
    if !state.couriers.contains_key(&courier_id) {
        return Err(AppError::NotFound(format!("courier {courier_id} not found")));
    }

    let now = Utc::now();
    {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        if delivery.courier_id.is_some() {
            return Ok(AssignOutcome::NotEligible);
        }
        let Some(next) = next_status(delivery.status, DeliveryEvent::Assign) else {
            return Ok(AssignOutcome::NotEligible);
        };

        delivery.status = next;
        delivery.courier_id = Some(courier_id);
        delivery.assigned_at = Some(now);
    }

    reconcile_courier_status(state, courier_id);
    state.metrics.deliveries_active.inc();

    let assignment = Assignment {
        id: Uuid::new_v4(),
        delivery_id,
        courier_id,
        score: 0.0,
        score_breakdown: ScoreBreakdown::default(),
        manual: true,
        assigned_at: now,
    };
    record_assignment(state, &assignment, "manual");

    Ok(AssignOutcome::Assigned(assignment))
}

/// Pull a delivery back from its courier and re-run the matching with that
/// courier out of the pool. May legitimately end with no courier, leaving
/// the delivery pending.
pub fn reassign(
    state: &AppState,
    delivery_id: Uuid,
    reason: String,
) -> Result<AssignOutcome, AppError> {
    let previous = {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        let Some(next) = next_status(delivery.status, DeliveryEvent::Release) else {
            return Ok(AssignOutcome::NotEligible);
        };
        let Some(previous) = delivery.courier_id else {
            return Ok(AssignOutcome::NotEligible);
        };

        delivery.status = next;
        delivery.courier_id = None;
        delivery.assigned_at = None;
        delivery.accepted_at = None;
        delivery.reassign_reason = Some(reason);
        previous
    };

    // The released courier only returns to Available if its remaining
    // active deliveries say so.
    reconcile_courier_status(state, previous);
    state.metrics.deliveries_active.dec();
    state
        .metrics
        .assignments_total
        .with_label_values(&["reassigned"])
        .inc();
    info!(delivery_id = %delivery_id, previous_courier = %previous, "delivery released for reassignment");

    assign_excluding(state, delivery_id, Some(previous))
}

/// Apply `assign` to each delivery independently; individual outcomes never
/// abort the batch.
pub fn bulk_assign(state: &AppState, delivery_ids: &[Uuid]) -> BulkAssignReport {
    let mut report = BulkAssignReport::default();

    for &delivery_id in delivery_ids {
        match assign(state, delivery_id) {
            Ok(AssignOutcome::Assigned(_)) => report.assigned += 1,
            Ok(AssignOutcome::NoCourierAvailable) => report.no_courier += 1,
            Ok(AssignOutcome::NotEligible) => report.not_eligible += 1,
            Err(err) => {
                warn!(delivery_id = %delivery_id, error = %err, "bulk assign item skipped");
                report.not_found += 1;
            }
        }
    }

    report
}

/// The one place capacity translates into courier status. Idempotent; called
/// after every change to a courier's active-delivery count. Only ever flips
/// between Available and Busy; offline, suspended and unapproved couriers
/// keep their status.
pub fn reconcile_courier_status(state: &AppState, courier_id: Uuid) {
    let active = state.active_delivery_count(courier_id);
    let cap = state.config.dispatch.max_active_deliveries;

    let Some(mut courier) = state.couriers.get_mut(&courier_id) else {
        return;
    };
    courier.status = match courier.status {
        CourierStatus::Available if active >= cap => CourierStatus::Busy,
        CourierStatus::Busy if active < cap => CourierStatus::Available,
        other => other,
    };
}

fn record_assignment(state: &AppState, assignment: &Assignment, outcome: &str) {
    state
        .assignments
        .insert(assignment.id, assignment.clone());
    let _ = state.assignment_events_tx.send(assignment.clone());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();
    info!(
        delivery_id = %assignment.delivery_id,
        courier_id = %assignment.courier_id,
        score = assignment.score,
        manual = assignment.manual,
        "delivery assigned"
    );
}
