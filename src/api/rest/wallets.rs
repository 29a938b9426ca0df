use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger;
use crate::models::wallet::{TransactionCategory, Wallet, WalletOwner, WalletTransaction};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallets/platform", get(get_platform_wallet))
        .route(
            "/wallets/platform/transactions",
            get(platform_transactions),
        )
        .route("/wallets/:kind/:id", get(get_wallet))
        .route("/wallets/:kind/:id/transactions", get(wallet_transactions))
        .route("/wallets/:kind/:id/topup", post(topup))
        .route("/wallets/:kind/:id/withdrawals", post(request_withdrawal))
        .route("/withdrawals/:tx_id/settle", post(settle_withdrawal))
}

#[derive(Deserialize)]
pub struct TopupRequest {
    pub amount: i64,
}

#[derive(Deserialize)]
pub struct WithdrawalRequest {
    pub amount: i64,
}

#[derive(Deserialize)]
pub struct SettleWithdrawalRequest {
    /// Whether the payout provider confirmed the transfer.
    pub success: bool,
}

fn parse_owner(kind: &str, id: Uuid) -> Result<WalletOwner, AppError> {
    match kind {
        "courier" => Ok(WalletOwner::Courier(id)),
        "pharmacy" => Ok(WalletOwner::Pharmacy(id)),
        other => Err(AppError::BadRequest(format!(
            "unknown wallet kind: {other}"
        ))),
    }
}

async fn get_platform_wallet(State(state): State<Arc<AppState>>) -> Json<Wallet> {
    Json(ledger::ensure_wallet(&state, WalletOwner::Platform))
}

async fn platform_transactions(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<WalletTransaction>> {
    Json(ledger::transactions_for(&state, WalletOwner::Platform))
}

async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<Wallet>, AppError> {
    let owner = parse_owner(&kind, id)?;
    Ok(Json(ledger::ensure_wallet(&state, owner)))
}

async fn wallet_transactions(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<WalletTransaction>>, AppError> {
    let owner = parse_owner(&kind, id)?;
    Ok(Json(ledger::transactions_for(&state, owner)))
}

async fn topup(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<TopupRequest>,
) -> Result<Json<WalletTransaction>, AppError> {
    let owner = parse_owner(&kind, id)?;
    let tx = ledger::credit(
        &state,
        owner,
        payload.amount,
        TransactionCategory::Topup,
        format!("topup-{}", Uuid::new_v4()),
        "wallet topup",
        None,
    )?;
    Ok(Json(tx))
}

async fn request_withdrawal(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<Json<WalletTransaction>, AppError> {
    let owner = parse_owner(&kind, id)?;
    let tx = ledger::request_withdrawal(&state, owner, payload.amount)?;
    Ok(Json(tx))
}

async fn settle_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(tx_id): Path<Uuid>,
    Json(payload): Json<SettleWithdrawalRequest>,
) -> Result<Json<WalletTransaction>, AppError> {
    let tx = ledger::settle_withdrawal(&state, tx_id, payload.success)?;
    Ok(Json(tx))
}
