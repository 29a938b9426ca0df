use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub dispatch: DispatchConfig,
    pub fees: FeeConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            dispatch: DispatchConfig::from_env()?,
            fees: FeeConfig::from_env()?,
        })
    }
}

/// Dispatch tuning. Injected into the candidate filter, the scoring engine
/// and the settlement path so none of them reach for a global settings store.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Active deliveries a courier may hold at once.
    pub max_active_deliveries: usize,
    /// Candidates beyond this great-circle distance from pickup are skipped.
    pub search_radius_km: f64,
    /// Amount moved courier -> platform per completed delivery.
    pub commission_amount: i64,
    pub currency: String,
}

impl DispatchConfig {
    pub const DEFAULT_MAX_ACTIVE_DELIVERIES: usize = 3;
    pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 15.0;
    pub const DEFAULT_COMMISSION_AMOUNT: i64 = 200;
    pub const DEFAULT_CURRENCY: &'static str = "NGN";

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            max_active_deliveries: parse_or_default(
                "MAX_ACTIVE_DELIVERIES",
                Self::DEFAULT_MAX_ACTIVE_DELIVERIES,
            )?,
            search_radius_km: parse_or_default("SEARCH_RADIUS_KM", Self::DEFAULT_SEARCH_RADIUS_KM)?,
            commission_amount: parse_or_default(
                "COMMISSION_AMOUNT",
                Self::DEFAULT_COMMISSION_AMOUNT,
            )?,
            currency: env::var("CURRENCY").unwrap_or_else(|_| Self::DEFAULT_CURRENCY.to_string()),
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_active_deliveries: Self::DEFAULT_MAX_ACTIVE_DELIVERIES,
            search_radius_km: Self::DEFAULT_SEARCH_RADIUS_KM,
            commission_amount: Self::DEFAULT_COMMISSION_AMOUNT,
            currency: Self::DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Fee rates and clamps, all in minor currency units. Order totals are
/// computed once from these at delivery creation and persisted.
#[derive(Debug, Clone)]
pub struct FeeConfig {
    pub delivery_base_fee: i64,
    pub delivery_per_km_rate: i64,
    pub delivery_min_fee: i64,
    pub delivery_max_fee: i64,
    pub service_fee_enabled: bool,
    pub service_fee_percent: f64,
    pub service_min_fee: i64,
    pub service_max_fee: i64,
    pub payment_fee_enabled: bool,
    pub payment_fixed_fee: i64,
    pub payment_fee_percent: f64,
}

impl FeeConfig {
    pub const DEFAULT_DELIVERY_BASE_FEE: i64 = 200;
    pub const DEFAULT_DELIVERY_PER_KM_RATE: i64 = 100;
    pub const DEFAULT_DELIVERY_MIN_FEE: i64 = 300;
    pub const DEFAULT_DELIVERY_MAX_FEE: i64 = 5000;
    pub const DEFAULT_SERVICE_FEE_PERCENT: f64 = 2.0;
    pub const DEFAULT_SERVICE_MIN_FEE: i64 = 100;
    pub const DEFAULT_SERVICE_MAX_FEE: i64 = 2000;
    pub const DEFAULT_PAYMENT_FIXED_FEE: i64 = 50;
    pub const DEFAULT_PAYMENT_FEE_PERCENT: f64 = 1.5;

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            delivery_base_fee: parse_or_default(
                "DELIVERY_BASE_FEE",
                Self::DEFAULT_DELIVERY_BASE_FEE,
            )?,
            delivery_per_km_rate: parse_or_default(
                "DELIVERY_PER_KM_RATE",
                Self::DEFAULT_DELIVERY_PER_KM_RATE,
            )?,
            delivery_min_fee: parse_or_default("DELIVERY_MIN_FEE", Self::DEFAULT_DELIVERY_MIN_FEE)?,
            delivery_max_fee: parse_or_default("DELIVERY_MAX_FEE", Self::DEFAULT_DELIVERY_MAX_FEE)?,
            service_fee_enabled: parse_or_default("SERVICE_FEE_ENABLED", true)?,
            service_fee_percent: parse_or_default(
                "SERVICE_FEE_PERCENT",
                Self::DEFAULT_SERVICE_FEE_PERCENT,
            )?,
            service_min_fee: parse_or_default("SERVICE_MIN_FEE", Self::DEFAULT_SERVICE_MIN_FEE)?,
            service_max_fee: parse_or_default("SERVICE_MAX_FEE", Self::DEFAULT_SERVICE_MAX_FEE)?,
            payment_fee_enabled: parse_or_default("PAYMENT_FEE_ENABLED", true)?,
            payment_fixed_fee: parse_or_default(
                "PAYMENT_FIXED_FEE",
                Self::DEFAULT_PAYMENT_FIXED_FEE,
            )?,
            payment_fee_percent: parse_or_default(
                "PAYMENT_FEE_PERCENT",
                Self::DEFAULT_PAYMENT_FEE_PERCENT,
            )?,
        })
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            delivery_base_fee: Self::DEFAULT_DELIVERY_BASE_FEE,
            delivery_per_km_rate: Self::DEFAULT_DELIVERY_PER_KM_RATE,
            delivery_min_fee: Self::DEFAULT_DELIVERY_MIN_FEE,
            delivery_max_fee: Self::DEFAULT_DELIVERY_MAX_FEE,
            service_fee_enabled: true,
            service_fee_percent: Self::DEFAULT_SERVICE_FEE_PERCENT,
            service_min_fee: Self::DEFAULT_SERVICE_MIN_FEE,
            service_max_fee: Self::DEFAULT_SERVICE_MAX_FEE,
            payment_fee_enabled: true,
            payment_fixed_fee: Self::DEFAULT_PAYMENT_FIXED_FEE,
            payment_fee_percent: Self::DEFAULT_PAYMENT_FEE_PERCENT,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
