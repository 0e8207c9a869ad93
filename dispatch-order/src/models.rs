use chrono::{DateTime, Utc};
use dispatch_core::{OrderId, ProductType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How carefully the parcel is handled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingCare {
    #[default]
    Standard,
    Fragile,
}

/// Carrier service level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingMethod {
    #[default]
    Ground,
    Express,
}

/// One requested unit of a product type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub product_type: ProductType,
    pub weight_kg: f64,
    pub volume_l: f64,
}

impl LineItem {
    pub fn new(product_type: ProductType, weight_kg: f64, volume_l: f64) -> Self {
        Self {
            product_type,
            weight_kg,
            volume_l,
        }
    }
}

/// A pending customer order waiting for stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub care: ShippingCare,
    pub method: ShippingMethod,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: String,
        items: Vec<LineItem>,
        care: ShippingCare,
        method: ShippingMethod,
    ) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            items,
            care,
            method,
            placed_at: Utc::now(),
        }
    }

    /// Required quantity per product type.
    ///
    /// Repeated product types add up instead of forming separate requirements.
    pub fn requirements(&self) -> BTreeMap<ProductType, usize> {
        let mut required = BTreeMap::new();
        for item in &self.items {
            *required.entry(item.product_type.clone()).or_insert(0) += 1;
        }
        required
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.items.iter().map(|i| i.weight_kg).sum()
    }

    pub fn total_volume_l(&self) -> f64 {
        self.items.iter().map(|i| i.volume_l).sum()
    }
}
