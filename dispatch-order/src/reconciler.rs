use crate::book::OrderQueueProvider;
use crate::fulfillment::{FulfillmentMatcher, Unshippable};
use crate::models::Order;
use crate::shipping::{ShipmentExecutor, ShipmentRecord};
use chrono::Utc;
use dispatch_catalog::{InventoryProvider, InventoryUnit};
use dispatch_core::{ChangeEvent, OrderId, UnitId};
use dispatch_shared::ReconciliationCompletedEvent;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ShippedOrder {
    pub record: ShipmentRecord,
    pub units: Vec<UnitId>,
}

#[derive(Debug, Clone)]
pub struct SkippedShipment {
    pub order_id: OrderId,
    pub error: String,
}

/// Everything one reconciliation pass decided and did
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub pass: u64,
    pub shipped: Vec<ShippedOrder>,
    /// Satisfiable orders whose shipment failed; left queued, stock untouched
    pub skipped: Vec<SkippedShipment>,
    pub unshippable: Vec<Unshippable>,
    pub inventory_before: usize,
    pub inventory_after: usize,
    pub orders_before: usize,
    pub orders_after: usize,
}

impl ReconcileReport {
    pub fn units_removed(&self) -> usize {
        self.shipped.iter().map(|s| s.units.len()).sum()
    }

    pub fn to_event(&self) -> ReconciliationCompletedEvent {
        ReconciliationCompletedEvent {
            pass: self.pass,
            shipped: self.shipped.len(),
            skipped: self.skipped.len(),
            unshippable: self.unshippable.len(),
            inventory_before: self.inventory_before,
            inventory_after: self.inventory_after,
            orders_before: self.orders_before,
            orders_after: self.orders_after,
            units_consumed: self.units_removed(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Provider state as seen at the end of the last pass
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub units: Vec<InventoryUnit>,
    pub orders: Vec<Order>,
}

/// Ships every order current stock can satisfy.
///
/// Only one pass runs at a time. Notifications that arrive during a pass are
/// coalesced into a follow-up pass instead of running concurrently or nesting.
pub struct Reconciler {
    inventory: Arc<dyn InventoryProvider>,
    orders: Arc<dyn OrderQueueProvider>,
    executor: ShipmentExecutor,
    matcher: FulfillmentMatcher,
    pass_lock: Mutex<()>,
    pending: AtomicBool,
    passes: AtomicU64,
    snapshot: Mutex<Snapshot>,
}

impl Reconciler {
    pub fn new(
        inventory: Arc<dyn InventoryProvider>,
        orders: Arc<dyn OrderQueueProvider>,
        executor: ShipmentExecutor,
    ) -> Self {
        let snapshot = Snapshot {
            units: inventory.available_units(),
            orders: orders.pending_orders(),
        };
        Self {
            inventory,
            orders,
            executor,
            matcher: FulfillmentMatcher::new(),
            pass_lock: Mutex::new(()),
            pending: AtomicBool::new(false),
            passes: AtomicU64::new(0),
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn executor(&self) -> &ShipmentExecutor {
        &self.executor
    }

    /// Number of passes run so far
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    /// Cached provider state from the end of the last pass
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Register with both providers so every relevant change triggers a pass.
    ///
    /// Listeners hold a weak reference; dropping the reconciler unsubscribes it
    /// in effect.
    pub fn subscribe(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.inventory.on_change(Arc::new(move |event: &ChangeEvent| {
            if let Some(reconciler) = weak.upgrade() {
                reconciler.notify(event);
            }
        }));

        let weak = Arc::downgrade(self);
        self.orders.on_change(Arc::new(move |event: &ChangeEvent| {
            if let Some(reconciler) = weak.upgrade() {
                reconciler.notify(event);
            }
        }));
    }

    /// React to a provider change.
    ///
    /// Returns the reports of the passes run by this call. Empty when the event
    /// cannot enable shipments or when another caller's pass is in progress and
    /// will pick the work up.
    pub fn notify(&self, event: &ChangeEvent) -> Vec<ReconcileReport> {
        if !event.may_enable_shipments() {
            debug!(?event, "Change cannot enable shipments; ignoring");
            return Vec::new();
        }

        info!(source = ?event.source(), "Change received - checking shippable orders");
        self.pending.store(true, Ordering::Release);
        self.drain_pending()
    }

    /// Run one pass now, waiting for any pass in progress to finish first.
    ///
    /// Must not be called from inside a provider listener: use [`Reconciler::notify`]
    /// there, which never blocks on the pass lock.
    pub fn reconcile(&self) -> ReconcileReport {
        let guard = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.pending.store(false, Ordering::Release);
        let report = self.run_pass();
        drop(guard);

        // Work queued by notifications that arrived while we held the lock
        self.drain_pending();
        report
    }

    fn drain_pending(&self) -> Vec<ReconcileReport> {
        let mut reports = Vec::new();
        loop {
            let guard = match self.try_lock_pass() {
                Some(guard) => guard,
                None => return reports,
            };
            while self.pending.swap(false, Ordering::AcqRel) {
                reports.push(self.run_pass());
            }
            drop(guard);

            // A notifier may have failed to take the lock just before we released it
            if !self.pending.load(Ordering::Acquire) {
                return reports;
            }
        }
    }

    fn try_lock_pass(&self) -> Option<MutexGuard<'_, ()>> {
        match self.pass_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Caller must hold `pass_lock`.
    fn run_pass(&self) -> ReconcileReport {
        let pass = self.passes.fetch_add(1, Ordering::AcqRel) + 1;

        let units = self.inventory.available_units();
        let orders = self.orders.pending_orders();
        let inventory_before = units.len();
        let orders_before = orders.len();

        info!(
            pass,
            inventory = inventory_before,
            orders = orders_before,
            stock = ?self.inventory.counts_by_type(),
            "Reconciliation pass started"
        );

        if orders.is_empty() {
            info!(pass, "There are no orders to check");
        }

        let outcome = self.matcher.match_orders(&units, &orders);

        for unshippable in &outcome.unshippable {
            info!(
                order_id = %unshippable.order.id,
                reason = %unshippable.reason,
                "An order could not be shipped"
            );
        }

        let mut shipped = Vec::with_capacity(outcome.shippable.len());
        let mut skipped = Vec::new();
        let mut shipped_orders = HashSet::new();

        for allocation in outcome.shippable {
            let order_id = allocation.order.id;
            info!(%order_id, units = allocation.units.len(), "An order could be shipped");

            match self.executor.ship(&allocation.order) {
                Ok(record) => {
                    let unit_ids = allocation.unit_ids();
                    let to_remove: HashSet<UnitId> = unit_ids.iter().copied().collect();
                    self.inventory.remove_units(&to_remove);
                    shipped_orders.insert(order_id);
                    shipped.push(ShippedOrder { record, units: unit_ids });
                }
                Err(e) => {
                    warn!(%order_id, error = %e, "Shipment failed; order stays queued");
                    skipped.push(SkippedShipment {
                        order_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !shipped_orders.is_empty() {
            self.orders.remove_orders(&shipped_orders);
        }

        let snapshot = Snapshot {
            units: self.inventory.available_units(),
            orders: self.orders.pending_orders(),
        };
        let report = ReconcileReport {
            pass,
            shipped,
            skipped,
            unshippable: outcome.unshippable,
            inventory_before,
            inventory_after: snapshot.units.len(),
            orders_before,
            orders_after: snapshot.orders.len(),
        };
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;

        info!(
            pass,
            shipped = report.shipped.len(),
            skipped = report.skipped.len(),
            unshippable = report.unshippable.len(),
            inventory_after = report.inventory_after,
            orders_after = report.orders_after,
            stock = ?self.inventory.counts_by_type(),
            "Reconciliation pass finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderBook;
    use crate::models::{LineItem, ShippingCare, ShippingMethod};
    use crate::strategy::ShippingRates;
    use dispatch_catalog::InMemoryInventory;
    use dispatch_core::ProductType;

    fn pt(name: &str) -> ProductType {
        ProductType::new(name).unwrap()
    }

    fn order(names: &[&str], method: ShippingMethod) -> Order {
        let items = names.iter().map(|n| LineItem::new(pt(n), 1.0, 2.0)).collect();
        Order::new("customer@example.com".to_string(), items, ShippingCare::Standard, method)
    }

    fn setup(
        executor: ShipmentExecutor,
    ) -> (Arc<InMemoryInventory>, Arc<OrderBook>, Arc<Reconciler>) {
        let inventory = Arc::new(InMemoryInventory::new());
        let book = Arc::new(OrderBook::new());
        let reconciler = Arc::new(Reconciler::new(inventory.clone(), book.clone(), executor));
        (inventory, book, reconciler)
    }

    #[test]
    fn test_empty_queue_changes_nothing() {
        let (inventory, book, reconciler) = setup(ShipmentExecutor::default());
        inventory.restock(InventoryUnit::batch(&pt("A"), 2, 1.0, 2.0));

        let report = reconciler.reconcile();

        assert!(report.shipped.is_empty());
        assert_eq!(inventory.len(), 2);
        assert!(book.is_empty());
        assert!(reconciler.executor().shipments().is_empty());
    }

    #[test]
    fn test_empty_inventory_changes_nothing() {
        let (inventory, book, reconciler) = setup(ShipmentExecutor::default());
        book.place(order(&["A"], ShippingMethod::Ground)).unwrap();

        let report = reconciler.reconcile();

        assert!(report.shipped.is_empty());
        assert_eq!(report.unshippable.len(), 1);
        assert!(inventory.is_empty());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_cost_failure_skips_order_and_continues() {
        let rates = ShippingRates {
            express_base_fee: -50.0,
            ..ShippingRates::default()
        };
        let (inventory, book, reconciler) = setup(ShipmentExecutor::new(rates));
        inventory.restock(InventoryUnit::batch(&pt("A"), 2, 1.0, 2.0));
        let failing = book.place(order(&["A"], ShippingMethod::Express)).unwrap();
        let passing = book.place(order(&["A"], ShippingMethod::Ground)).unwrap();

        let report = reconciler.reconcile();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].order_id, failing);
        assert_eq!(report.shipped.len(), 1);
        assert_eq!(report.shipped[0].record.order_id, passing);

        // Failed order keeps its place and its units stay in stock
        assert_eq!(book.pending_orders().iter().map(|o| o.id).collect::<Vec<_>>(), vec![failing]);
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_snapshot_refreshed_after_pass() {
        let (inventory, book, reconciler) = setup(ShipmentExecutor::default());
        inventory.restock(InventoryUnit::batch(&pt("A"), 1, 1.0, 2.0));
        book.place(order(&["A"], ShippingMethod::Ground)).unwrap();
        assert_eq!(reconciler.snapshot().units.len(), 0);

        reconciler.reconcile();

        let snapshot = reconciler.snapshot();
        assert!(snapshot.units.is_empty());
        assert!(snapshot.orders.is_empty());
    }

    #[test]
    fn test_subscribed_reconciler_reacts_without_nesting() {
        let (inventory, book, reconciler) = setup(ShipmentExecutor::default());
        reconciler.subscribe();

        // Order first: nothing in stock, one pass ships nothing
        book.place(order(&["A", "B"], ShippingMethod::Ground)).unwrap();
        assert_eq!(reconciler.passes(), 1);
        assert_eq!(book.len(), 1);

        // Restock triggers a pass whose own removals must not start another
        inventory.restock(vec![
            InventoryUnit::new(pt("A"), 1.0, 2.0),
            InventoryUnit::new(pt("B"), 1.0, 2.0),
        ]);
        assert_eq!(reconciler.passes(), 2);
        assert!(book.is_empty());
        assert!(inventory.is_empty());
        assert_eq!(reconciler.executor().shipments().len(), 1);
    }

    #[test]
    fn test_removal_events_are_ignored() {
        let (_inventory, _book, reconciler) = setup(ShipmentExecutor::default());
        let reports = reconciler.notify(&ChangeEvent::UnitsRemoved { count: 4 });
        assert!(reports.is_empty());
        assert_eq!(reconciler.passes(), 0);
    }

    #[test]
    fn test_report_event_counts() {
        let (inventory, book, reconciler) = setup(ShipmentExecutor::default());
        inventory.restock(InventoryUnit::batch(&pt("A"), 3, 1.0, 2.0));
        book.place(order(&["A", "A"], ShippingMethod::Ground)).unwrap();
        book.place(order(&["A", "A"], ShippingMethod::Ground)).unwrap();

        let report = reconciler.reconcile();
        let event = report.to_event();

        assert_eq!(event.shipped, 1);
        assert_eq!(event.unshippable, 1);
        assert_eq!(event.units_consumed, report.units_removed());
        assert_eq!(event.orders_after, 1);
    }

    #[test]
    fn test_event_counts_consumed_units_despite_mid_pass_restock() {
        let (inventory, book, reconciler) = setup(ShipmentExecutor::default());
        let restocker = inventory.clone();
        reconciler.executor().subscribe(Arc::new(move |_: &ShipmentRecord| {
            restocker.restock(vec![InventoryUnit::new(pt("A"), 1.0, 2.0)]);
        }));
        inventory.restock(vec![InventoryUnit::new(pt("A"), 1.0, 2.0)]);
        book.place(order(&["A"], ShippingMethod::Ground)).unwrap();

        let report = reconciler.reconcile();
        let event = report.to_event();

        assert_eq!(report.inventory_before, 1);
        assert_eq!(report.inventory_after, 1);
        assert_eq!(report.units_removed(), 1);
        assert_eq!(event.units_consumed, 1);
        assert_eq!(inventory.len(), 1);
        assert!(book.is_empty());
    }
}
