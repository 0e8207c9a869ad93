use crate::models::Order;
use dispatch_core::{ChangeEvent, ChangeListener, ListenerRegistry, OrderId};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Queue of orders waiting to be fulfilled, oldest first
pub trait OrderQueueProvider: Send + Sync {
    /// Snapshot of pending orders in arrival order
    fn pending_orders(&self) -> Vec<Order>;

    /// Remove the given orders in one batch. Unknown ids are ignored.
    /// Returns how many orders were actually removed.
    fn remove_orders(&self, ids: &HashSet<OrderId>) -> usize;

    /// Register a change listener
    fn on_change(&self, listener: ChangeListener);
}

/// In-memory order book
#[derive(Default)]
pub struct OrderBook {
    orders: Mutex<Vec<Order>>,
    listeners: ListenerRegistry,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order to the back of the queue and notify listeners
    pub fn place(&self, order: Order) -> Result<OrderId, OrderError> {
        let order_id = order.id;
        {
            let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
            if orders.iter().any(|o| o.id == order_id) {
                return Err(OrderError::Duplicate(order_id));
            }
            orders.push(order);
        }

        tracing::info!(%order_id, "Order placed");
        self.listeners.notify(&ChangeEvent::OrderPlaced { order_id });
        Ok(order_id)
    }

    /// Get a pending order by ID
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|o| o.id == *order_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderQueueProvider for OrderBook {
    fn pending_orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn remove_orders(&self, ids: &HashSet<OrderId>) -> usize {
        let removed = {
            let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
            let before = orders.len();
            orders.retain(|o| !ids.contains(&o.id));
            before - orders.len()
        };

        if removed > 0 {
            tracing::debug!(removed, "Orders removed from book");
            self.listeners.notify(&ChangeEvent::OrdersRemoved { count: removed });
        }
        removed
    }

    fn on_change(&self, listener: ChangeListener) {
        self.listeners.register(listener);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order already queued: {0}")]
    Duplicate(OrderId),
}
