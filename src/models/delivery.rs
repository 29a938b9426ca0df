use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;
use crate::models::order::{OrderTotals, PaymentMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    Accepted,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Cancelled | DeliveryStatus::Failed
        )
    }

    /// Statuses that occupy a slot of the courier's concurrency cap.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Assigned
                | DeliveryStatus::Accepted
                | DeliveryStatus::PickedUp
                | DeliveryStatus::InTransit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEvent {
    Assign,
    /// Reassignment path: back to the pending pool with the courier cleared.
    Release,
    Accept,
    PickUp,
    StartTransit,
    Complete,
    Cancel,
    Fail,
}

/// The one transition table. Every status change in the orchestrator goes
/// through here; `None` means the event is not legal from that status.
pub fn next_status(current: DeliveryStatus, event: DeliveryEvent) -> Option<DeliveryStatus> {
    use DeliveryEvent::*;
    use DeliveryStatus::*;

    match (current, event) {
        (Pending, Assign) => Some(Assigned),
        (Assigned | Accepted, Release) => Some(Pending),
        (Assigned, Accept) => Some(Accepted),
        (Accepted, PickUp) => Some(PickedUp),
        (PickedUp, StartTransit) => Some(InTransit),
        (InTransit, Complete) => Some(Delivered),
        (s, Cancel) if !s.is_terminal() => Some(Cancelled),
        (s, Fail) if !s.is_terminal() => Some(Failed),
        _ => None,
    }
}

/// One physical transport of one order. Never deleted, only terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub status: DeliveryStatus,
    pub courier_id: Option<Uuid>,
    pub pickup: Option<GeoPoint>,
    pub dropoff: Option<GeoPoint>,
    pub distance_km: Option<f64>,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub assigned_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub reassign_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
