use crate::models::Order;
use crate::strategy::ShippingRates;
use chrono::{DateTime, Utc};
use dispatch_core::{OrderId, ShipmentId};
use dispatch_shared::{Masked, ShipmentDispatchedEvent};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

pub type ShipmentListener = Arc<dyn Fn(&ShipmentRecord) + Send + Sync>;

/// A shipment that has been costed and reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub customer_id: String,
    pub shipping_method: String,
    pub shipping_care: String,
    pub item_count: usize,
    pub weight_kg: f64,
    pub volume_l: f64,
    pub method_cost: f64,
    pub care_cost: f64,
    pub total_cost: f64,
    pub shipped_at: DateTime<Utc>,
}

impl ShipmentRecord {
    pub fn to_event(&self) -> ShipmentDispatchedEvent {
        ShipmentDispatchedEvent {
            shipment_id: self.id.0,
            order_id: self.order_id.0,
            customer_id: Masked(self.customer_id.clone()),
            shipping_method: self.shipping_method.clone(),
            shipping_care: self.shipping_care.clone(),
            unit_count: self.item_count,
            total_cost: self.total_cost,
            timestamp: self.shipped_at.timestamp(),
        }
    }
}

/// Costs satisfiable orders and reports the resulting shipments.
///
/// Never touches inventory or the order queue.
pub struct ShipmentExecutor {
    rates: ShippingRates,
    shipments: Mutex<Vec<ShipmentRecord>>,
    listeners: Mutex<Vec<ShipmentListener>>,
}

impl ShipmentExecutor {
    pub fn new(rates: ShippingRates) -> Self {
        Self {
            rates,
            shipments: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener called for every completed shipment
    pub fn subscribe(&self, listener: ShipmentListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Every shipment recorded so far, oldest first
    pub fn shipments(&self) -> Vec<ShipmentRecord> {
        self.shipments.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Combine the order's method and care strategies into a total cost and
    /// record the shipment.
    pub fn ship(&self, order: &Order) -> Result<ShipmentRecord, ShipmentError> {
        let method = self.rates.method_strategy(order.method);
        let care = self.rates.care_strategy(order.care);

        let weight_kg = order.total_weight_kg();
        let volume_l = order.total_volume_l();

        let method_cost = method.compute_cost(order, weight_kg, volume_l);
        validate_cost(order.id, method.name(), method_cost)?;
        let care_cost = care.compute_cost(order, weight_kg, volume_l);
        validate_cost(order.id, care.name(), care_cost)?;
        let total_cost = method_cost + care_cost;
        validate_cost(order.id, "total", total_cost)?;

        let record = ShipmentRecord {
            id: ShipmentId::new(),
            order_id: order.id,
            customer_id: order.customer_id.clone(),
            shipping_method: method.name().to_string(),
            shipping_care: care.name().to_string(),
            item_count: order.items.len(),
            weight_kg,
            volume_l,
            method_cost,
            care_cost,
            total_cost,
            shipped_at: Utc::now(),
        };

        tracing::info!(
            order_id = %order.id,
            method = method.name(),
            care = care.name(),
            total_cost = record.total_cost,
            "Order shipped"
        );

        self.shipments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());

        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners {
            listener(&record);
        }

        Ok(record)
    }
}

impl Default for ShipmentExecutor {
    fn default() -> Self {
        Self::new(ShippingRates::default())
    }
}

fn validate_cost(
    order_id: OrderId,
    strategy: &'static str,
    cost: f64,
) -> Result<(), ShipmentError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(ShipmentError::InvalidCost { order_id, strategy, cost });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ShipmentError {
    #[error("Invalid shipping cost {cost} from {strategy} for order {order_id}")]
    InvalidCost {
        order_id: OrderId,
        strategy: &'static str,
        cost: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineItem, ShippingCare, ShippingMethod};
    use dispatch_core::ProductType;

    fn order(method: ShippingMethod) -> Order {
        Order::new(
            "customer@example.com".to_string(),
            vec![LineItem::new(ProductType::new("Speaker").unwrap(), 2.0, 10.0)],
            ShippingCare::Fragile,
            method,
        )
    }

    #[test]
    fn test_ship_combines_method_and_care() {
        let executor = ShipmentExecutor::default();
        let record = executor.ship(&order(ShippingMethod::Ground)).unwrap();

        // ground: 4.99 + 2 * 0.50 + 10 * 0.05, fragile: 1 * 2.00 + 2 * 0.75
        assert!((record.method_cost - 6.49).abs() < 1e-9);
        assert!((record.care_cost - 3.5).abs() < 1e-9);
        assert!((record.total_cost - 9.99).abs() < 1e-9);
        assert_eq!(record.shipping_method, "GroundShipping");
        assert_eq!(record.shipping_care, "FragileCare");
        assert_eq!(executor.shipments().len(), 1);
    }

    #[test]
    fn test_negative_cost_rejected() {
        let rates = ShippingRates {
            express_base_fee: -100.0,
            ..ShippingRates::default()
        };
        let executor = ShipmentExecutor::new(rates);

        let result = executor.ship(&order(ShippingMethod::Express));
        assert!(matches!(
            result,
            Err(ShipmentError::InvalidCost { strategy: "ExpressShipping", .. })
        ));
        assert!(executor.shipments().is_empty());
    }

    #[test]
    fn test_non_finite_cost_rejected() {
        let rates = ShippingRates {
            fragile_per_kg: f64::NAN,
            ..ShippingRates::default()
        };
        let executor = ShipmentExecutor::new(rates);

        let result = executor.ship(&order(ShippingMethod::Ground));
        assert!(matches!(result, Err(ShipmentError::InvalidCost { strategy: "FragileCare", .. })));
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let rates = ShippingRates {
            express_base_fee: f64::MAX,
            fragile_per_item: f64::MAX,
            ..ShippingRates::default()
        };
        let executor = ShipmentExecutor::new(rates);

        let result = executor.ship(&order(ShippingMethod::Express));
        assert!(matches!(result, Err(ShipmentError::InvalidCost { strategy: "total", .. })));
        assert!(executor.shipments().is_empty());
    }

    #[test]
    fn test_listeners_receive_shipments() {
        let executor = ShipmentExecutor::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        executor.subscribe(Arc::new(move |r: &ShipmentRecord| {
            sink.lock().unwrap().push(r.order_id)
        }));

        let order = order(ShippingMethod::Ground);
        executor.ship(&order).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![order.id]);
    }

    #[test]
    fn test_event_masks_customer_in_debug() {
        let executor = ShipmentExecutor::default();
        let record = executor.ship(&order(ShippingMethod::Ground)).unwrap();
        let event = record.to_event();

        assert_eq!(event.order_id, record.order_id.0);
        assert!(!format!("{:?}", event).contains("customer@example.com"));
    }
}
