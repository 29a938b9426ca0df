use chrono::{DateTime, Utc};

use crate::config::DispatchConfig;
use crate::engine::filter::Candidate;
use crate::models::assignment::ScoreBreakdown;

const DISTANCE_POINTS: f64 = 40.0;
const RATING_POINTS: f64 = 30.0;
const EXPERIENCE_POINTS: f64 = 20.0;
const FRESHNESS_POINTS: f64 = 10.0;

/// Mid-value awarded when the pickup-to-courier distance is unknown.
const UNKNOWN_DISTANCE_POINTS: f64 = 20.0;
const DEFAULT_RATING: f64 = 3.0;

/// A ping this recent earns full freshness points.
const FRESH_WINDOW_MINUTES: f64 = 5.0;
/// A ping this old (or older) earns none.
const STALE_CUTOFF_MINUTES: f64 = 60.0;

/// One completed delivery is worth this many experience points, saturating
/// at 100 lifetime deliveries.
const DELIVERIES_PER_POINT: f64 = 5.0;

/// 0-100 desirability of one candidate for one pickup.
pub fn score_candidate(
    candidate: &Candidate,
    now: DateTime<Utc>,
    config: &DispatchConfig,
) -> (f64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        distance_score: distance_score(candidate.distance_km, config.search_radius_km),
        rating_score: rating_score(candidate.courier.rating),
        experience_score: experience_score(candidate.courier.completed_deliveries),
        freshness_score: freshness_score(candidate.courier.location_updated_at, now),
    };

    let total = breakdown.distance_score
        + breakdown.rating_score
        + breakdown.experience_score
        + breakdown.freshness_score;

    (total, breakdown)
}

/// Highest composite score wins; input order breaks exact ties. `None` on an
/// empty candidate set.
pub fn pick_best(
    candidates: &[Candidate],
    now: DateTime<Utc>,
    config: &DispatchConfig,
) -> Option<(Candidate, f64, ScoreBreakdown)> {
    let mut best: Option<(Candidate, f64, ScoreBreakdown)> = None;

    for candidate in candidates {
        let (score, breakdown) = score_candidate(candidate, now, config);
        let beats = best.as_ref().is_none_or(|(_, top, _)| score > *top);
        if beats {
            best = Some((candidate.clone(), score, breakdown));
        }
    }

    best
}

fn distance_score(distance_km: Option<f64>, radius_km: f64) -> f64 {
    match distance_km {
        None => UNKNOWN_DISTANCE_POINTS,
        Some(d) => {
            if radius_km <= 0.0 {
                return 0.0;
            }
            (DISTANCE_POINTS * (1.0 - d / radius_km)).clamp(0.0, DISTANCE_POINTS)
        }
    }
}

fn rating_score(rating: Option<f64>) -> f64 {
    let rating = rating.unwrap_or(DEFAULT_RATING);
    (rating / 5.0 * RATING_POINTS).clamp(0.0, RATING_POINTS)
}

fn experience_score(completed: u32) -> f64 {
    (completed as f64 / DELIVERIES_PER_POINT).min(EXPERIENCE_POINTS)
}

fn freshness_score(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(updated_at) = updated_at else {
        return 0.0;
    };

    let age_minutes = (now - updated_at).num_seconds() as f64 / 60.0;
    if age_minutes <= FRESH_WINDOW_MINUTES {
        FRESHNESS_POINTS
    } else if age_minutes >= STALE_CUTOFF_MINUTES {
        0.0
    } else {
        let decay =
            (age_minutes - FRESH_WINDOW_MINUTES) / (STALE_CUTOFF_MINUTES - FRESH_WINDOW_MINUTES);
        FRESHNESS_POINTS * (1.0 - decay)
    }
}
