use crate::app_config::Config;
use crate::worker::{forward_changes, WorkerSender};
use dispatch_catalog::{InMemoryInventory, InventoryProvider};
use dispatch_order::{OrderBook, OrderQueueProvider, Reconciler, ShipmentExecutor};
use std::sync::Arc;

/// Process-wide components, built once at startup and passed explicitly
#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<InMemoryInventory>,
    pub book: Arc<OrderBook>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let inventory = Arc::new(InMemoryInventory::new());
        let book = Arc::new(OrderBook::new());
        let executor = ShipmentExecutor::new(config.shipping.clone());
        let reconciler = Arc::new(Reconciler::new(inventory.clone(), book.clone(), executor));

        Self {
            inventory,
            book,
            reconciler,
        }
    }

    /// Route every provider change to the reconciliation worker
    pub fn connect(&self, tx: WorkerSender) {
        self.inventory.on_change(forward_changes(tx.clone()));
        self.book.on_change(forward_changes(tx));
    }
}
