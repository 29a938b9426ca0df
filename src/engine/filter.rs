use uuid::Uuid;

use crate::geo::haversine_km;
use crate::models::courier::{Courier, CourierStatus, GeoPoint};
use crate::state::AppState;

/// A courier that survived the filter, with the pickup distance when the
/// pickup location is known.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub courier: Courier,
    pub distance_km: Option<f64>,
}

/// Narrows the pool to couriers that are available, geolocated, under the
/// concurrency cap and (when a pickup point is known) within the search
/// radius. Capacity and radius are two independent in-process predicates.
///
/// An empty result is a normal outcome: nobody is serviceable right now.
pub fn eligible_candidates(
    state: &AppState,
    pickup: Option<&GeoPoint>,
    exclude: Option<Uuid>,
) -> Vec<Candidate> {
    let cap = state.config.dispatch.max_active_deliveries;
    let radius_km = state.config.dispatch.search_radius_km;

    let mut candidates: Vec<Candidate> = state
        .couriers
        .iter()
        .filter_map(|entry| {
            let courier = entry.value();

            if courier.status != CourierStatus::Available {
                return None;
            }
            let location = courier.location.as_ref()?;
            if Some(courier.id) == exclude {
                return None;
            }
            if state.active_delivery_count(courier.id) >= cap {
                return None;
            }

            let distance_km = pickup.map(|p| haversine_km(p, location));
            if let Some(d) = distance_km {
                if d > radius_km {
                    return None;
                }
            }

            Some(Candidate {
                courier: courier.clone(),
                distance_km,
            })
        })
        .collect();

    // DashMap iteration order is not stable; sort so ties resolve the same
    // way on every run.
    candidates.sort_by_key(|c| c.courier.id);
    candidates
}
