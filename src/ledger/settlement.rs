//! Commission settlement: the paired courier-to-platform movement recorded
//! when a delivery completes, and the balance gate that decides whether a
//! courier may take on work at all.

use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger::{available_balance, credit, transfer};
use crate::models::delivery::Delivery;
use crate::models::wallet::{TransactionCategory, WalletOwner};
use crate::state::AppState;

pub fn can_accept_work(state: &AppState, courier_id: Uuid) -> bool {
    available_balance(state, WalletOwner::Courier(courier_id))
        >= state.config.dispatch.commission_amount
}

/// Same gate as [`can_accept_work`], as a typed failure for callers that
/// must refuse the action.
pub fn check_commission_cover(state: &AppState, courier_id: Uuid) -> Result<(), AppError> {
    let commission = state.config.dispatch.commission_amount;
    let available = available_balance(state, WalletOwner::Courier(courier_id));
    if available < commission {
        return Err(AppError::InsufficientBalance {
            requested: commission,
            available,
        });
    }
    Ok(())
}

/// Ledger movements for one completed delivery: commission courier ->
/// platform as a paired debit/credit, delivery fee to the courier, goods
/// subtotal to the pharmacy.
///
/// The commission transfer goes first and is the only step that can fail,
/// so a refused settlement leaves every wallet untouched.
pub fn settle_delivery(
    state: &AppState,
    delivery: &Delivery,
    courier_id: Uuid,
) -> Result<(), AppError> {
    let commission = state.config.dispatch.commission_amount;
    let courier = WalletOwner::Courier(courier_id);

    let result = transfer(
        state,
        courier,
        WalletOwner::Platform,
        commission,
        TransactionCategory::Commission,
        &format!("commission-{}", delivery.id),
        Some(delivery.id),
    );
    if let Err(err) = result {
        if matches!(err, AppError::InsufficientBalance { .. }) {
            state
                .metrics
                .settlements_total
                .with_label_values(&["insufficient_balance"])
                .inc();
        }
        return Err(err);
    }

    if delivery.totals.delivery_fee > 0 {
        credit(
            state,
            courier,
            delivery.totals.delivery_fee,
            TransactionCategory::DeliveryEarning,
            format!("earning-{}", delivery.id),
            "delivery fee earned",
            Some(delivery.id),
        )?;
    }
    if delivery.totals.subtotal > 0 {
        credit(
            state,
            WalletOwner::Pharmacy(delivery.pharmacy_id),
            delivery.totals.subtotal,
            TransactionCategory::DeliveryEarning,
            format!("sale-{}", delivery.id),
            "order subtotal",
            Some(delivery.id),
        )?;
    }

    state
        .metrics
        .settlements_total
        .with_label_values(&["settled"])
        .inc();
    info!(
        delivery_id = %delivery.id,
        courier_id = %courier_id,
        commission,
        "delivery settled"
    );
    Ok(())
}
