use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger account owner. A sum type rather than a type-string/id pair so the
/// platform account needs no sentinel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WalletOwner {
    Platform,
    Pharmacy(Uuid),
    Courier(Uuid),
}

impl std::fmt::Display for WalletOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletOwner::Platform => write!(f, "platform"),
            WalletOwner::Pharmacy(id) => write!(f, "pharmacy/{id}"),
            WalletOwner::Courier(id) => write!(f, "courier/{id}"),
        }
    }
}

/// Balance-bearing account. `balance` must always equal the replayed sum of
/// the wallet's Completed transactions; `pending_withdrawals` is the hold
/// placed by withdrawal requests awaiting the payout provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub owner: WalletOwner,
    pub balance: i64,
    pub pending_withdrawals: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner: WalletOwner, currency: String, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            balance: 0,
            pending_withdrawals: 0,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Balance a debit may draw on: stored balance minus withdrawal holds.
    pub fn available(&self) -> i64 {
        self.balance - self.pending_withdrawals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Topup,
    DeliveryEarning,
    Commission,
    Withdrawal,
    Bonus,
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// One immutable ledger entry. Only `status` (and the `balance_after`
/// snapshot taken when a pending row completes) ever changes after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub owner: WalletOwner,
    pub tx_type: TransactionType,
    /// Always positive; the sign comes from `tx_type`.
    pub amount: i64,
    /// Balance snapshot after the movement applied; `None` while pending.
    pub balance_after: Option<i64>,
    pub category: TransactionCategory,
    pub delivery_id: Option<Uuid>,
    pub status: TransactionStatus,
    /// Correlates paired entries: a commission debit and its mirrored
    /// platform credit share the same base reference.
    pub reference: String,
    pub description: String,
    /// Process-wide insertion order, used to replay a wallet's history.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Contribution of this entry to a replayed balance.
    pub fn signed_amount(&self) -> i64 {
        match self.tx_type {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}
