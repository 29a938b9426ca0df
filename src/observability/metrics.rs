use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub deliveries_active: IntGauge,
    pub settlements_total: IntCounterVec,
    pub withdrawals_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let deliveries_active = IntGauge::new(
            "deliveries_active",
            "Deliveries currently occupying a courier slot",
        )
        .expect("valid deliveries_active metric");

        let settlements_total = IntCounterVec::new(
            Opts::new("settlements_total", "Commission settlements by outcome"),
            &["outcome"],
        )
        .expect("valid settlements_total metric");

        let withdrawals_total = IntCounterVec::new(
            Opts::new("withdrawals_total", "Withdrawal requests by outcome"),
            &["outcome"],
        )
        .expect("valid withdrawals_total metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(deliveries_active.clone()))
            .expect("register deliveries_active");
        registry
            .register(Box::new(settlements_total.clone()))
            .expect("register settlements_total");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("register withdrawals_total");

        Self {
            registry,
            assignments_total,
            deliveries_active,
            settlements_total,
            withdrawals_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
