use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub rating_score: f64,
    pub experience_score: f64,
    pub freshness_score: f64,
}

/// Audit record of one courier selection. Also the payload of the
/// notification broadcast to the assigned courier's delivery channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub courier_id: Uuid,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    /// Operator override, no scoring involved.
    pub manual: bool,
    pub assigned_at: DateTime<Utc>,
}
