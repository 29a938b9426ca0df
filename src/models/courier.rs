use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourierStatus {
    Available,
    Busy,
    Offline,
    Suspended,
    PendingApproval,
}

/// A dispatchable agent. `status` and `completed_deliveries` are mutated by
/// the orchestrator; `location`/`location_updated_at` only by the courier's
/// own pings (last writer wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub status: CourierStatus,
    pub location: Option<GeoPoint>,
    pub location_updated_at: Option<DateTime<Utc>>,
    /// 0.0 - 5.0; unrated couriers score with a neutral default.
    pub rating: Option<f64>,
    pub completed_deliveries: u32,
    pub created_at: DateTime<Utc>,
}
