use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use pharma_dispatch::api::rest::router;
use pharma_dispatch::config::Config;
use pharma_dispatch::engine::assignment::{self, AssignOutcome};
use pharma_dispatch::ledger;
use pharma_dispatch::models::courier::{Courier, CourierStatus, GeoPoint};
use pharma_dispatch::models::wallet::WalletOwner;
use pharma_dispatch::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

fn test_config() -> Config {
    Config {
        http_port: 0,
        log_level: "info".to_string(),
        event_buffer_size: 64,
        dispatch: Default::default(),
        fees: Default::default(),
    }
}

fn setup() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(test_config()));
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

const PHARMACY: GeoPoint = GeoPoint {
    lat: 6.5244,
    lng: 3.3792,
};

async fn create_courier(app: &axum::Router, name: &str, location: GeoPoint) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "name": name,
                "location": { "lat": location.lat, "lng": location.lng },
                "rating": 4.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn topup_courier(app: &axum::Router, courier_id: &str, amount: i64) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/wallets/courier/{courier_id}/topup"),
            json!({ "amount": amount }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

async fn create_delivery(app: &axum::Router, subtotal: i64) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries",
            json!({
                "pharmacy_id": Uuid::new_v4(),
                "pickup": { "lat": PHARMACY.lat, "lng": PHARMACY.lng },
                "dropoff": { "lat": PHARMACY.lat + 0.02, "lng": PHARMACY.lng + 0.02 },
                "subtotal": subtotal,
                "payment_method": "Cash"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn get_delivery(app: &axum::Router, id: &str) -> Value {
    let res = app
        .clone()
        .oneshot(get_request(&format!("/deliveries/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

async fn courier_by_id(app: &axum::Router, id: &str) -> Value {
    let res = app.clone().oneshot(get_request("/couriers")).await.unwrap();
    let couriers = body_json(res).await;
    couriers
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == id)
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["deliveries"], 0);
    assert_eq!(body["wallets"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("deliveries_active"));
}

#[tokio::test]
async fn create_courier_empty_name_returns_400() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "  ", "location": { "lat": 6.5, "lng": 3.4 } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_courier_rating_clamped_to_5() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": "Musa", "rating": 9.9 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["rating"], 5.0);
    assert!(body["location"].is_null());
}

#[tokio::test]
async fn location_ping_updates_coordinates_and_freshness() {
    let (app, state) = setup();
    let id = create_courier(&app, "Ngozi", PHARMACY).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/location"),
            json!({ "location": { "lat": 6.6018, "lng": 3.3515 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["location"]["lat"], 6.6018);

    let courier = state.couriers.get(&id.parse::<Uuid>().unwrap()).unwrap();
    assert!(courier.location_updated_at.is_some());
}

#[tokio::test]
async fn delivery_creation_computes_and_persists_fees() {
    // subtotal 10,000 at 6 km, cash: 800 delivery + 200 service + 0 payment
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/deliveries",
            json!({
                "pharmacy_id": Uuid::new_v4(),
                "subtotal": 10_000,
                "payment_method": "Cash",
                "distance_km": 6.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["totals"]["subtotal"], 10_000);
    assert_eq!(body["totals"]["delivery_fee"], 800);
    assert_eq!(body["totals"]["service_fee"], 200);
    assert_eq!(body["totals"]["payment_fee"], 0);
    assert_eq!(body["totals"]["total"], 11_000);
}

#[tokio::test]
async fn delivery_with_non_positive_subtotal_is_rejected() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/deliveries",
            json!({
                "pharmacy_id": Uuid::new_v4(),
                "subtotal": 0,
                "payment_method": "Card"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assign_matches_pending_delivery_to_courier() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    let delivery_id = create_delivery(&app, 10_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let assignment = body_json(res).await;
    assert_eq!(assignment["courier_id"], courier_id);
    assert_eq!(assignment["delivery_id"], delivery_id);
    assert_eq!(assignment["manual"], false);
    assert!(assignment["score"].as_f64().unwrap() > 0.0);

    let delivery = get_delivery(&app, &delivery_id).await;
    assert_eq!(delivery["status"], "Assigned");
    assert_eq!(delivery["courier_id"], courier_id);
    assert!(delivery["assigned_at"].is_string());

    // one active delivery is under the cap of three
    let courier = courier_by_id(&app, &courier_id).await;
    assert_eq!(courier["status"], "Available");
}

#[tokio::test]
async fn assign_with_empty_pool_leaves_delivery_pending() {
    let (app, state) = setup();
    let delivery_id = create_delivery(&app, 5_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let delivery = get_delivery(&app, &delivery_id).await;
    assert_eq!(delivery["status"], "Pending");
    assert!(delivery["courier_id"].is_null());
    assert!(state.assignments.is_empty());
}

#[tokio::test]
async fn second_assign_is_a_conflict_without_double_booking() {
    let (app, state) = setup();
    create_courier(&app, "Kunle", PHARMACY).await;
    let delivery_id = create_delivery(&app, 10_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    assert_eq!(state.assignments.len(), 1);
    assert_eq!(
        state
            .active_delivery_count(state.assignments.iter().next().unwrap().courier_id),
        1
    );
}

#[tokio::test]
async fn highest_composite_score_wins() {
    // X: at the pickup, 5.0 rating, 100 deliveries, pinged a minute ago.
    // Y: 10 km out, 3.0 rating, no history, pinged 50 minutes ago.
    let (_app, state) = setup();
    let now = Utc::now();

    let x = Uuid::new_v4();
    let y = Uuid::new_v4();
    state.couriers.insert(
        x,
        Courier {
            id: x,
            name: "X".to_string(),
            status: CourierStatus::Available,
            location: Some(PHARMACY),
            location_updated_at: Some(now - Duration::minutes(1)),
            rating: Some(5.0),
            completed_deliveries: 100,
            created_at: now,
        },
    );
    state.couriers.insert(
        y,
        Courier {
            id: y,
            name: "Y".to_string(),
            status: CourierStatus::Available,
            // roughly 10 km north of the pickup
            location: Some(GeoPoint {
                lat: PHARMACY.lat + 0.09,
                lng: PHARMACY.lng,
            }),
            location_updated_at: Some(now - Duration::minutes(50)),
            rating: Some(3.0),
            completed_deliveries: 0,
            created_at: now,
        },
    );

    let app = router(state.clone());
    let delivery_id = create_delivery(&app, 10_000).await;

    let outcome = assignment::assign(&state, delivery_id.parse().unwrap()).unwrap();
    match outcome {
        AssignOutcome::Assigned(assignment) => {
            assert_eq!(assignment.courier_id, x);
            assert!(assignment.score > 95.0);
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[tokio::test]
async fn courier_goes_busy_at_capacity_and_recovers_on_cancel() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;

    let mut delivery_ids = Vec::new();
    for _ in 0..3 {
        let id = create_delivery(&app, 2_000).await;
        let res = app
            .clone()
            .oneshot(post_request(&format!("/deliveries/{id}/assign")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        delivery_ids.push(id);
    }

    let courier = courier_by_id(&app, &courier_id).await;
    assert_eq!(courier["status"], "Busy");

    // at capacity, the courier is no longer a candidate
    let overflow = create_delivery(&app, 2_000).await;
    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{overflow}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{}/cancel", delivery_ids[0]),
            json!({ "reason": "customer cancelled" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let courier = courier_by_id(&app, &courier_id).await;
    assert_eq!(courier["status"], "Available");
}

#[tokio::test]
async fn manual_assign_bypasses_the_filter() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;

    // knock the courier out of the candidate pool
    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{courier_id}/status"),
            json!({ "status": "Offline" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let delivery_id = create_delivery(&app, 4_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = app
        .clone()
        .oneshot(post_request(&format!(
            "/deliveries/{delivery_id}/assign/{courier_id}"
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let assignment = body_json(res).await;
    assert_eq!(assignment["manual"], true);
    assert_eq!(assignment["courier_id"], courier_id);

    let delivery = get_delivery(&app, &delivery_id).await;
    assert_eq!(delivery["status"], "Assigned");
}

#[tokio::test]
async fn reassign_never_repicks_the_released_courier() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    let delivery_id = create_delivery(&app, 4_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // the sole courier in range is excluded, so reassignment finds nobody
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/reassign"),
            json!({ "reason": "courier unreachable" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let delivery = get_delivery(&app, &delivery_id).await;
    assert_eq!(delivery["status"], "Pending");
    assert!(delivery["courier_id"].is_null());
    assert!(delivery["assigned_at"].is_null());
    assert_eq!(delivery["reassign_reason"], "courier unreachable");

    // the released courier got its slot back
    let courier = courier_by_id(&app, &courier_id).await;
    assert_eq!(courier["status"], "Available");
}

#[tokio::test]
async fn reassign_picks_another_courier_when_one_exists() {
    let (app, _state) = setup();
    let first = create_courier(&app, "Kunle", PHARMACY).await;
    let second = create_courier(
        &app,
        "Ngozi",
        GeoPoint {
            lat: PHARMACY.lat + 0.01,
            lng: PHARMACY.lng,
        },
    )
    .await;
    let delivery_id = create_delivery(&app, 4_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let winner = body_json(res).await["courier_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(winner, first, "nearer courier should win the first pass");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/deliveries/{delivery_id}/reassign"),
            json!({ "reason": "pharmacy delay" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let assignment = body_json(res).await;
    assert_eq!(assignment["courier_id"], second);
}

#[tokio::test]
async fn accept_is_gated_on_commission_cover() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    let delivery_id = create_delivery(&app, 4_000).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // empty wallet: cannot take on work
    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/accept")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);

    topup_courier(&app, &courier_id, 200).await;

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/accept")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let delivery = body_json(res).await;
    assert_eq!(delivery["status"], "Accepted");
    assert!(delivery["accepted_at"].is_string());
}

#[tokio::test]
async fn completed_delivery_settles_commission_and_earnings() {
    let (app, state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    topup_courier(&app, &courier_id, 500).await;
    let delivery_id = create_delivery(&app, 10_000).await;

    for step in ["assign", "accept", "pickup", "transit", "complete"] {
        let res = app
            .clone()
            .oneshot(post_request(&format!("/deliveries/{delivery_id}/{step}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "step {step} failed");
    }

    let delivery = get_delivery(&app, &delivery_id).await;
    assert_eq!(delivery["status"], "Delivered");
    assert!(delivery["delivered_at"].is_string());

    let courier_uuid: Uuid = courier_id.parse().unwrap();
    let delivery_fee = delivery["totals"]["delivery_fee"].as_i64().unwrap();
    let courier_owner = WalletOwner::Courier(courier_uuid);

    // 500 topup - 200 commission + delivery fee
    let courier_wallet = state.wallets.get(&courier_owner).unwrap().clone();
    assert_eq!(courier_wallet.balance, 500 - 200 + delivery_fee);
    assert_eq!(
        state.wallets.get(&WalletOwner::Platform).unwrap().balance,
        200
    );

    let pharmacy_id: Uuid = delivery["pharmacy_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(
        state
            .wallets
            .get(&WalletOwner::Pharmacy(pharmacy_id))
            .unwrap()
            .balance,
        10_000
    );

    // the balances replay from their completed transactions
    assert_eq!(
        ledger::replayed_balance(&state, courier_owner),
        courier_wallet.balance
    );
    assert_eq!(ledger::replayed_balance(&state, WalletOwner::Platform), 200);

    let courier = courier_by_id(&app, &courier_id).await;
    assert_eq!(courier["completed_deliveries"], 1);
    assert_eq!(courier["status"], "Available");
}

#[tokio::test]
async fn completion_refused_when_commission_is_not_covered() {
    let (app, state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    topup_courier(&app, &courier_id, 350).await;
    let delivery_id = create_delivery(&app, 10_000).await;

    for step in ["assign", "accept", "pickup", "transit"] {
        let res = app
            .clone()
            .oneshot(post_request(&format!("/deliveries/{delivery_id}/{step}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "step {step} failed");
    }

    // drain the wallet to 150 while the delivery is on the road
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/wallets/courier/{courier_id}/withdrawals"),
            json!({ "amount": 200 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let withdrawal = body_json(res).await;
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/withdrawals/{}/settle", withdrawal["id"].as_str().unwrap()),
            json!({ "success": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/complete")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);

    // nothing moved, nothing terminated
    let courier_uuid: Uuid = courier_id.parse().unwrap();
    assert_eq!(
        state
            .wallets
            .get(&WalletOwner::Courier(courier_uuid))
            .unwrap()
            .balance,
        150
    );
    assert!(state.wallets.get(&WalletOwner::Platform).is_none());
    let delivery = get_delivery(&app, &delivery_id).await;
    assert_eq!(delivery["status"], "InTransit");

    // a topup unblocks completion
    topup_courier(&app, &courier_id, 100).await;
    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/complete")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn wallet_endpoints_expose_balance_and_history() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    topup_courier(&app, &courier_id, 1_000).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/wallets/courier/{courier_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let wallet = body_json(res).await;
    assert_eq!(wallet["balance"], 1_000);
    assert_eq!(wallet["pending_withdrawals"], 0);

    let res = app
        .clone()
        .oneshot(get_request(&format!(
            "/wallets/courier/{courier_id}/transactions"
        )))
        .await
        .unwrap();
    let txs = body_json(res).await;
    let list = txs.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["category"], "topup");
    assert_eq!(list[0]["status"], "completed");
    assert_eq!(list[0]["balance_after"], 1_000);
}

#[tokio::test]
async fn topup_with_non_positive_amount_is_rejected() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/wallets/courier/{courier_id}/topup"),
            json!({ "amount": -5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn withdrawal_flow_over_rest() {
    let (app, _state) = setup();
    let courier_id = create_courier(&app, "Kunle", PHARMACY).await;
    topup_courier(&app, &courier_id, 1_000).await;

    // over-drawing is refused up front
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/wallets/courier/{courier_id}/withdrawals"),
            json!({ "amount": 2_000 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYMENT_REQUIRED);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/wallets/courier/{courier_id}/withdrawals"),
            json!({ "amount": 600 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let withdrawal = body_json(res).await;
    assert_eq!(withdrawal["status"], "pending");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/wallets/courier/{courier_id}")))
        .await
        .unwrap();
    let wallet = body_json(res).await;
    assert_eq!(wallet["balance"], 1_000);
    assert_eq!(wallet["pending_withdrawals"], 600);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/withdrawals/{}/settle", withdrawal["id"].as_str().unwrap()),
            json!({ "success": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let settled = body_json(res).await;
    assert_eq!(settled["status"], "completed");
    assert_eq!(settled["balance_after"], 400);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/wallets/courier/{courier_id}")))
        .await
        .unwrap();
    let wallet = body_json(res).await;
    assert_eq!(wallet["balance"], 400);
    assert_eq!(wallet["pending_withdrawals"], 0);
}

#[tokio::test]
async fn bulk_assign_reports_per_item_outcomes() {
    let (app, _state) = setup();
    create_courier(&app, "Kunle", PHARMACY).await;

    let near = create_delivery(&app, 3_000).await;

    // pickup far outside the search radius
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries",
            json!({
                "pharmacy_id": Uuid::new_v4(),
                "pickup": { "lat": PHARMACY.lat + 1.0, "lng": PHARMACY.lng },
                "subtotal": 3_000,
                "payment_method": "Cash"
            }),
        ))
        .await
        .unwrap();
    let remote = body_json(res).await["id"].as_str().unwrap().to_string();

    // already assigned before the batch runs
    let taken = create_delivery(&app, 3_000).await;
    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{taken}/assign")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let missing = Uuid::new_v4().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries/bulk-assign",
            json!({ "delivery_ids": [near, remote, taken, missing] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let report = body_json(res).await;
    assert_eq!(report["assigned"], 1);
    assert_eq!(report["no_courier"], 1);
    assert_eq!(report["not_eligible"], 1);
    assert_eq!(report["not_found"], 1);
}

#[tokio::test]
async fn out_of_order_progress_is_a_conflict() {
    let (app, _state) = setup();
    create_courier(&app, "Kunle", PHARMACY).await;
    let delivery_id = create_delivery(&app, 3_000).await;

    // cannot pick up a delivery that was never assigned/accepted
    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/pickup")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(post_request(&format!("/deliveries/{delivery_id}/complete")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn get_nonexistent_delivery_returns_404() {
    let (app, _state) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/deliveries/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
