use dispatch_core::{ChangeEvent, ChangeListener, ListenerRegistry, ProductType, UnitId};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::product::InventoryUnit;

/// Source of truth for available stock.
///
/// Callers that mutate stock outside a reconciliation pass while one is
/// running violate the exclusive-access contract; providers do not guard
/// against it.
pub trait InventoryProvider: Send + Sync {
    /// Snapshot of every available unit, in stock order
    fn available_units(&self) -> Vec<InventoryUnit>;

    /// Remove exactly the given units. Unknown ids are ignored.
    /// Returns how many units were actually removed.
    fn remove_units(&self, ids: &HashSet<UnitId>) -> usize;

    /// Register a change listener
    fn on_change(&self, listener: ChangeListener);

    /// Available unit count per product type
    fn counts_by_type(&self) -> BTreeMap<ProductType, usize> {
        let mut counts = BTreeMap::new();
        for unit in self.available_units() {
            *counts.entry(unit.product_type).or_insert(0) += 1;
        }
        counts
    }
}

/// In-memory inventory (restocking happens through [`InMemoryInventory::restock`])
#[derive(Default)]
pub struct InMemoryInventory {
    units: Mutex<Vec<InventoryUnit>>,
    listeners: ListenerRegistry,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the inventory without publishing a change event
    pub fn with_units(units: Vec<InventoryUnit>) -> Self {
        Self {
            units: Mutex::new(units),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Add units to stock and notify listeners
    pub fn restock(&self, units: Vec<InventoryUnit>) {
        if units.is_empty() {
            return;
        }

        let count = units.len();
        let product_types: Vec<ProductType> = units
            .iter()
            .map(|u| u.product_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        self.units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(units);

        tracing::info!(count, ?product_types, "Inventory restocked");
        self.listeners.notify(&ChangeEvent::UnitsAdded { count, product_types });
    }

    pub fn len(&self) -> usize {
        self.units.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InventoryProvider for InMemoryInventory {
    fn available_units(&self) -> Vec<InventoryUnit> {
        self.units.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn remove_units(&self, ids: &HashSet<UnitId>) -> usize {
        let removed = {
            let mut units = self.units.lock().unwrap_or_else(PoisonError::into_inner);
            let before = units.len();
            units.retain(|u| !ids.contains(&u.id));
            before - units.len()
        };

        // Lock released before notifying so listeners can read stock
        if removed > 0 {
            tracing::debug!(removed, "Inventory units removed");
            self.listeners.notify(&ChangeEvent::UnitsRemoved { count: removed });
        }
        removed
    }

    fn on_change(&self, listener: ChangeListener) {
        self.listeners.register(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn laptop() -> ProductType {
        ProductType::new("Laptop").unwrap()
    }

    #[test]
    fn test_inventory_lifecycle() {
        let inventory = InMemoryInventory::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        inventory.on_change(Arc::new(move |e: &ChangeEvent| sink.lock().unwrap().push(e.clone())));

        // Restock
        inventory.restock(InventoryUnit::batch(&laptop(), 3, 2.0, 6.0));
        assert_eq!(inventory.len(), 3);
        assert_eq!(inventory.counts_by_type()[&laptop()], 3);

        // Remove two specific units
        let ids: HashSet<UnitId> = inventory
            .available_units()
            .iter()
            .take(2)
            .map(|u| u.id)
            .collect();
        assert_eq!(inventory.remove_units(&ids), 2);
        assert_eq!(inventory.len(), 1);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ChangeEvent::UnitsAdded { count: 3, .. }));
        assert_eq!(events[1], ChangeEvent::UnitsRemoved { count: 2 });
    }

    #[test]
    fn test_repeated_removal_is_noop() {
        let inventory = InMemoryInventory::with_units(InventoryUnit::batch(&laptop(), 1, 2.0, 6.0));
        let ids: HashSet<UnitId> = inventory.available_units().iter().map(|u| u.id).collect();

        assert_eq!(inventory.remove_units(&ids), 1);

        let notified = Arc::new(Mutex::new(0));
        let counter = notified.clone();
        inventory.on_change(Arc::new(move |_: &ChangeEvent| *counter.lock().unwrap() += 1));

        assert_eq!(inventory.remove_units(&ids), 0);
        assert_eq!(*notified.lock().unwrap(), 0);
    }

    #[test]
    fn test_snapshot_preserves_stock_order() {
        let inventory = InMemoryInventory::new();
        let first = InventoryUnit::batch(&laptop(), 2, 2.0, 6.0);
        let expected: Vec<UnitId> = first.iter().map(|u| u.id).collect();
        inventory.restock(first);

        let snapshot: Vec<UnitId> = inventory.available_units().iter().map(|u| u.id).collect();
        assert_eq!(snapshot, expected);
    }
}
