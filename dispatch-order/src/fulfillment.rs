//! Greedy order-to-stock matching.
//!
//! Orders are considered strictly in queue order. Each order takes the first
//! matching units of every product type it needs from a pass-local working
//! view; an earlier order can therefore starve a later one even when some
//! other assignment would ship both.

use crate::models::Order;
use dispatch_catalog::InventoryUnit;
use dispatch_core::{ProductType, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// Units selected to satisfy one order within one pass
#[derive(Debug, Clone)]
pub struct Allocation {
    pub order: Order,
    pub units: Vec<InventoryUnit>,
}

impl Allocation {
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub product_type: ProductType,
    pub needed: usize,
    pub available: usize,
}

/// Why an order could not be shipped this pass. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnshippableReason {
    EmptyOrder,
    InsufficientStock { shortages: Vec<Shortage> },
}

impl fmt::Display for UnshippableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnshippableReason::EmptyOrder => write!(f, "there are no items in this order"),
            UnshippableReason::InsufficientStock { shortages } => {
                write!(f, "lack of stock:")?;
                for s in shortages {
                    write!(
                        f,
                        " {} (needed {}, available {})",
                        s.product_type, s.needed, s.available
                    )?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Unshippable {
    pub order: Order,
    pub reason: UnshippableReason,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Satisfiable orders in queue order, each with its exact units
    pub shippable: Vec<Allocation>,
    pub unshippable: Vec<Unshippable>,
}

/// Decides which queued orders current stock can fully satisfy
#[derive(Debug, Clone, Copy, Default)]
pub struct FulfillmentMatcher;

impl FulfillmentMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Match `orders` (queue order) against an inventory snapshot.
    ///
    /// Never fails; non-fulfillment is reported through `unshippable`.
    pub fn match_orders(&self, inventory: &[InventoryUnit], orders: &[Order]) -> MatchOutcome {
        let mut view = WorkingView::index(inventory);
        let mut outcome = MatchOutcome::default();

        for order in orders {
            if order.items.is_empty() {
                outcome.unshippable.push(Unshippable {
                    order: order.clone(),
                    reason: UnshippableReason::EmptyOrder,
                });
                continue;
            }

            match view.allocate(&order.requirements()) {
                Ok(units) => outcome.shippable.push(Allocation {
                    order: order.clone(),
                    units,
                }),
                Err(shortages) => outcome.unshippable.push(Unshippable {
                    order: order.clone(),
                    reason: UnshippableReason::InsufficientStock { shortages },
                }),
            }
        }

        outcome
    }
}

/// Pass-local stock index. Units taken by one order are gone for every later
/// order in the same pass.
struct WorkingView {
    by_type: HashMap<ProductType, VecDeque<InventoryUnit>>,
}

impl WorkingView {
    fn index(inventory: &[InventoryUnit]) -> Self {
        let mut by_type: HashMap<ProductType, VecDeque<InventoryUnit>> = HashMap::new();
        for unit in inventory {
            by_type
                .entry(unit.product_type.clone())
                .or_default()
                .push_back(unit.clone());
        }
        Self { by_type }
    }

    fn available(&self, product_type: &ProductType) -> usize {
        self.by_type.get(product_type).map_or(0, VecDeque::len)
    }

    /// Take every required unit, or nothing at all.
    fn allocate(
        &mut self,
        required: &BTreeMap<ProductType, usize>,
    ) -> Result<Vec<InventoryUnit>, Vec<Shortage>> {
        let shortages: Vec<Shortage> = required
            .iter()
            .filter_map(|(product_type, &needed)| {
                let available = self.available(product_type);
                (available < needed).then(|| Shortage {
                    product_type: product_type.clone(),
                    needed,
                    available,
                })
            })
            .collect();

        if !shortages.is_empty() {
            return Err(shortages);
        }

        let mut units = Vec::with_capacity(required.values().sum());
        for (product_type, &needed) in required {
            if let Some(stock) = self.by_type.get_mut(product_type) {
                units.extend(stock.drain(..needed));
            }
        }
        Ok(units)
    }
}
