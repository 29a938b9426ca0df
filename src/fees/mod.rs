//! Pure fee arithmetic over an injected [`FeeConfig`]. All amounts are in
//! minor currency units; fractional intermediate values round up.

use crate::config::FeeConfig;
use crate::models::order::{OrderTotals, PaymentMethod};

pub fn delivery_fee(config: &FeeConfig, distance_km: f64) -> i64 {
    let variable = (distance_km.max(0.0) * config.delivery_per_km_rate as f64).ceil() as i64;
    (config.delivery_base_fee + variable).clamp(config.delivery_min_fee, config.delivery_max_fee)
}

pub fn service_fee(config: &FeeConfig, subtotal: i64) -> i64 {
    if !config.service_fee_enabled {
        return 0;
    }
    ceil_percent(subtotal, config.service_fee_percent)
        .clamp(config.service_min_fee, config.service_max_fee)
}

/// `amount` is the order value including all prior fees. Waived for cash.
pub fn payment_fee(config: &FeeConfig, amount: i64, method: PaymentMethod) -> i64 {
    if method == PaymentMethod::Cash || !config.payment_fee_enabled {
        return 0;
    }
    config.payment_fixed_fee + ceil_percent(amount, config.payment_fee_percent)
}

/// Composes the full fee stack. The subtotal passes through untouched: the
/// pharmacy is owed exactly the goods value however the fees layer on top.
pub fn order_totals(
    config: &FeeConfig,
    subtotal: i64,
    distance_km: Option<f64>,
    method: PaymentMethod,
) -> OrderTotals {
    let delivery_fee = delivery_fee(config, distance_km.unwrap_or(0.0));
    let service_fee = service_fee(config, subtotal);
    let payment_fee = payment_fee(config, subtotal + delivery_fee + service_fee, method);

    OrderTotals {
        subtotal,
        delivery_fee,
        service_fee,
        payment_fee,
        total: subtotal + delivery_fee + service_fee + payment_fee,
    }
}

fn ceil_percent(amount: i64, percent: f64) -> i64 {
    (amount as f64 * percent / 100.0).ceil() as i64
}
