use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::ids::{OrderId, ProductType};

/// Which provider raised a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeSource {
    Inventory,
    OrderQueue,
}

/// Change notification published by the inventory and order queue providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEvent {
    UnitsAdded {
        count: usize,
        product_types: Vec<ProductType>,
    },
    UnitsRemoved {
        count: usize,
    },
    OrderPlaced {
        order_id: OrderId,
    },
    OrdersRemoved {
        count: usize,
    },
}

impl ChangeEvent {
    pub fn source(&self) -> ChangeSource {
        match self {
            ChangeEvent::UnitsAdded { .. } | ChangeEvent::UnitsRemoved { .. } => {
                ChangeSource::Inventory
            }
            ChangeEvent::OrderPlaced { .. } | ChangeEvent::OrdersRemoved { .. } => {
                ChangeSource::OrderQueue
            }
        }
    }

    /// Whether this change can turn a previously unshippable order shippable.
    ///
    /// Removals only shrink stock or the queue, so they never warrant a new pass.
    pub fn may_enable_shipments(&self) -> bool {
        matches!(self, ChangeEvent::UnitsAdded { .. } | ChangeEvent::OrderPlaced { .. })
    }
}

pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Plain registered-handler list used by the providers
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<ChangeListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: ChangeListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener.
    ///
    /// The list is cloned before delivery so listeners may re-enter the
    /// provider (or register more listeners) without deadlocking.
    pub fn notify(&self, event: &ChangeEvent) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::trace!(?event, listeners = listeners.len(), "Publishing change event");
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_removals_do_not_enable_shipments() {
        assert!(!ChangeEvent::UnitsRemoved { count: 3 }.may_enable_shipments());
        assert!(!ChangeEvent::OrdersRemoved { count: 1 }.may_enable_shipments());
        assert!(ChangeEvent::OrderPlaced { order_id: OrderId::new() }.may_enable_shipments());
        assert!(ChangeEvent::UnitsAdded { count: 1, product_types: vec![] }.may_enable_shipments());
    }

    #[test]
    fn test_event_source() {
        assert_eq!(ChangeEvent::UnitsRemoved { count: 1 }.source(), ChangeSource::Inventory);
        assert_eq!(ChangeEvent::OrdersRemoved { count: 1 }.source(), ChangeSource::OrderQueue);
    }

    #[test]
    fn test_registry_delivers_to_all_listeners() {
        let registry = Arc::new(ListenerRegistry::new());
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let hits = hits.clone();
            registry.register(Arc::new(move |_: &ChangeEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        registry.notify(&ChangeEvent::UnitsRemoved { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_can_reenter_registry() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = registry.clone();
        registry.register(Arc::new(move |_: &ChangeEvent| {
            // Would deadlock if the lock were held during delivery
            assert_eq!(inner.len(), 1);
        }));

        registry.notify(&ChangeEvent::OrdersRemoved { count: 1 });
    }
}
