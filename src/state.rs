use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::models::assignment::Assignment;
use crate::models::courier::Courier;
use crate::models::delivery::Delivery;
use crate::models::wallet::{Wallet, WalletOwner, WalletTransaction};
use crate::observability::metrics::Metrics;

/// Shared store. DashMap entry guards are the transaction boundary: a
/// precondition check and its write happen under one guard, so concurrent
/// conflicting calls on the same delivery or wallet serialize.
///
/// Never take a second guard into the same map, and never iterate a map
/// while holding one of its guards.
pub struct AppState {
    pub config: Config,
    pub couriers: DashMap<Uuid, Courier>,
    pub deliveries: DashMap<Uuid, Delivery>,
    pub assignments: DashMap<Uuid, Assignment>,
    pub wallets: DashMap<WalletOwner, Wallet>,
    pub transactions: DashMap<Uuid, WalletTransaction>,
    tx_seq: AtomicU64,
    pub assignment_events_tx: broadcast::Sender<Assignment>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (assignment_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            config,
            couriers: DashMap::new(),
            deliveries: DashMap::new(),
            assignments: DashMap::new(),
            wallets: DashMap::new(),
            transactions: DashMap::new(),
            tx_seq: AtomicU64::new(0),
            assignment_events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Monotone ledger sequence; gives transactions a replayable order.
    pub fn next_seq(&self) -> u64 {
        self.tx_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Deliveries currently occupying a slot of the courier's cap.
    pub fn active_delivery_count(&self, courier_id: Uuid) -> usize {
        self.deliveries
            .iter()
            .filter(|entry| {
                let d = entry.value();
                d.courier_id == Some(courier_id) && d.status.is_active()
            })
            .count()
    }
}
