//! Append-only, balance-tracked ledger. Each movement mutates the wallet and
//! inserts its transaction row under the wallet's entry guard, so a balance
//! and its history never drift apart.

pub mod settlement;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::wallet::{
    TransactionCategory, TransactionStatus, TransactionType, Wallet, WalletOwner,
    WalletTransaction,
};
use crate::state::AppState;

pub fn ensure_wallet(state: &AppState, owner: WalletOwner) -> Wallet {
    state
        .wallets
        .entry(owner)
        .or_insert_with(|| {
            Wallet::new(owner, state.config.dispatch.currency.clone(), Utc::now())
        })
        .clone()
}

/// Stored balance minus withdrawal holds; zero for a wallet that was never
/// opened.
pub fn available_balance(state: &AppState, owner: WalletOwner) -> i64 {
    state
        .wallets
        .get(&owner)
        .map(|w| w.available())
        .unwrap_or(0)
}

pub fn credit(
    state: &AppState,
    owner: WalletOwner,
    amount: i64,
    category: TransactionCategory,
    reference: impl Into<String>,
    description: impl Into<String>,
    delivery_id: Option<Uuid>,
) -> Result<WalletTransaction, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(amount));
    }

    let now = Utc::now();
    let mut wallet = state.wallets.entry(owner).or_insert_with(|| {
        Wallet::new(owner, state.config.dispatch.currency.clone(), now)
    });

    wallet.balance += amount;
    wallet.updated_at = now;

    let tx = WalletTransaction {
        id: Uuid::new_v4(),
        owner,
        tx_type: TransactionType::Credit,
        amount,
        balance_after: Some(wallet.balance),
        category,
        delivery_id,
        status: TransactionStatus::Completed,
        reference: reference.into(),
        description: description.into(),
        seq: state.next_seq(),
        created_at: now,
    };
    state.transactions.insert(tx.id, tx.clone());

    info!(owner = %owner, amount, category = ?category, "wallet credited");
    Ok(tx)
}

/// Fails with InsufficientBalance, changing nothing, if the wallet cannot
/// cover the amount. There is no partial debit.
pub fn debit(
    state: &AppState,
    owner: WalletOwner,
    amount: i64,
    category: TransactionCategory,
    reference: impl Into<String>,
    description: impl Into<String>,
    delivery_id: Option<Uuid>,
) -> Result<WalletTransaction, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(amount));
    }

    let now = Utc::now();
    let Some(mut wallet) = state.wallets.get_mut(&owner) else {
        return Err(AppError::InsufficientBalance {
            requested: amount,
            available: 0,
        });
    };
    if wallet.available() < amount {
        return Err(AppError::InsufficientBalance {
            requested: amount,
            available: wallet.available(),
        });
    }

    wallet.balance -= amount;
    wallet.updated_at = now;

    let tx = WalletTransaction {
        id: Uuid::new_v4(),
        owner,
        tx_type: TransactionType::Debit,
        amount,
        balance_after: Some(wallet.balance),
        category,
        delivery_id,
        status: TransactionStatus::Completed,
        reference: reference.into(),
        description: description.into(),
        seq: state.next_seq(),
        created_at: now,
    };
    state.transactions.insert(tx.id, tx.clone());

    info!(owner = %owner, amount, category = ?category, "wallet debited");
    Ok(tx)
}

/// Paired movement: a debit on `from` mirrored by an equal credit on `to`,
/// both carrying `base_reference`. The debit lands first and is the only
/// fallible step, so the pair commits whole or not at all.
pub fn transfer(
    state: &AppState,
    from: WalletOwner,
    to: WalletOwner,
    amount: i64,
    category: TransactionCategory,
    base_reference: &str,
    delivery_id: Option<Uuid>,
) -> Result<(WalletTransaction, WalletTransaction), AppError> {
    let debit_tx = debit(
        state,
        from,
        amount,
        category,
        base_reference,
        format!("transfer to {to}"),
        delivery_id,
    )?;
    let credit_tx = credit(
        state,
        to,
        amount,
        category,
        base_reference,
        format!("transfer from {from}"),
        delivery_id,
    )?;

    Ok((debit_tx, credit_tx))
}

/// Start an asynchronous payout. The amount is held against the wallet
/// (`pending_withdrawals`), the balance itself is untouched until the payout
/// provider reports back, and the row stays Pending.
pub fn request_withdrawal(
    state: &AppState,
    owner: WalletOwner,
    amount: i64,
) -> Result<WalletTransaction, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(amount));
    }

    let now = Utc::now();
    let Some(mut wallet) = state.wallets.get_mut(&owner) else {
        return Err(AppError::InsufficientBalance {
            requested: amount,
            available: 0,
        });
    };
    if wallet.available() < amount {
        return Err(AppError::InsufficientBalance {
            requested: amount,
            available: wallet.available(),
        });
    }

    wallet.pending_withdrawals += amount;
    wallet.updated_at = now;

    let id = Uuid::new_v4();
    let tx = WalletTransaction {
        id,
        owner,
        tx_type: TransactionType::Debit,
        amount,
        balance_after: None,
        category: TransactionCategory::Withdrawal,
        delivery_id: None,
        status: TransactionStatus::Pending,
        reference: format!("withdrawal-{id}"),
        description: "payout requested".to_string(),
        seq: state.next_seq(),
        created_at: now,
    };
    state.transactions.insert(tx.id, tx.clone());

    state
        .metrics
        .withdrawals_total
        .with_label_values(&["requested"])
        .inc();
    info!(owner = %owner, amount, "withdrawal requested");
    Ok(tx)
}

/// Resolve a pending withdrawal once the payout provider reports. Success
/// releases the hold and debits the balance in one step; failure releases
/// the hold and marks the row Failed, leaving the balance as it was.
pub fn settle_withdrawal(
    state: &AppState,
    tx_id: Uuid,
    success: bool,
) -> Result<WalletTransaction, AppError> {
    let now = Utc::now();

    let owner = {
        let tx = state
            .transactions
            .get(&tx_id)
            .ok_or_else(|| AppError::NotFound(format!("transaction {tx_id} not found")))?;
        if tx.category != TransactionCategory::Withdrawal {
            return Err(AppError::BadRequest(format!(
                "transaction {tx_id} is not a withdrawal"
            )));
        }
        tx.owner
    };

    // Guards are taken wallet-first, like every other movement; the status
    // is re-checked under them so a duplicate settle call loses.
    let mut wallet = state.wallets.get_mut(&owner).ok_or_else(|| {
        AppError::Internal(format!("wallet {owner} missing for pending withdrawal"))
    })?;
    let Some(mut tx) = state.transactions.get_mut(&tx_id) else {
        return Err(AppError::NotFound(format!("transaction {tx_id} not found")));
    };
    if tx.status != TransactionStatus::Pending {
        return Err(AppError::NotEligible(format!(
            "withdrawal {tx_id} already settled"
        )));
    }

    wallet.pending_withdrawals -= tx.amount;
    wallet.updated_at = now;
    if success {
        wallet.balance -= tx.amount;
        tx.status = TransactionStatus::Completed;
        tx.balance_after = Some(wallet.balance);
    } else {
        tx.status = TransactionStatus::Failed;
    }

    let outcome = if success { "completed" } else { "failed" };
    state
        .metrics
        .withdrawals_total
        .with_label_values(&[outcome])
        .inc();
    info!(owner = %tx.owner, amount = tx.amount, outcome, "withdrawal settled");
    Ok(tx.clone())
}

/// A wallet's history in insertion order.
pub fn transactions_for(state: &AppState, owner: WalletOwner) -> Vec<WalletTransaction> {
    let mut txs: Vec<WalletTransaction> = state
        .transactions
        .iter()
        .filter(|entry| entry.owner == owner)
        .map(|entry| entry.value().clone())
        .collect();
    txs.sort_by_key(|tx| tx.seq);
    txs
}

/// Reconstruct the balance by replaying Completed transactions in creation
/// order. Must always equal the stored balance.
pub fn replayed_balance(state: &AppState, owner: WalletOwner) -> i64 {
    transactions_for(state, owner)
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Completed)
        .map(|tx| tx.signed_amount())
        .sum()
}
