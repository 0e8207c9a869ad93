use uuid::Uuid;

use crate::pii::Masked;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ShipmentDispatchedEvent {
    pub shipment_id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Masked<String>,
    pub shipping_method: String,
    pub shipping_care: String,
    pub unit_count: usize,
    pub total_cost: f64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReconciliationCompletedEvent {
    pub pass: u64,
    pub shipped: usize,
    pub skipped: usize,
    pub unshippable: usize,
    pub inventory_before: usize,
    pub inventory_after: usize,
    pub orders_before: usize,
    pub orders_after: usize,
    /// Units deducted for shipped orders. Restocks landing mid-pass mean this
    /// can differ from `inventory_before - inventory_after`.
    pub units_consumed: usize,
    pub timestamp: i64,
}
