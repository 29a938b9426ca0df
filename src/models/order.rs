use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileMoney,
}

/// Computed once at delivery creation by the fee calculator and persisted;
/// later reads consult these figures instead of recomputing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Goods value owed to the pharmacy, always preserved verbatim.
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub payment_fee: i64,
    pub total: i64,
}
