use chrono::{DateTime, Utc};
use dispatch_core::{ProductType, UnitId};
use serde::{Deserialize, Serialize};

/// One physical product instance held in stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryUnit {
    pub id: UnitId,
    pub product_type: ProductType,
    pub weight_kg: f64,
    pub volume_l: f64,
    pub received_at: DateTime<Utc>,
}

impl InventoryUnit {
    pub fn new(product_type: ProductType, weight_kg: f64, volume_l: f64) -> Self {
        Self {
            id: UnitId::new(),
            product_type,
            weight_kg,
            volume_l,
            received_at: Utc::now(),
        }
    }

    /// `count` fresh units of the same product, each with its own identity
    pub fn batch(
        product_type: &ProductType,
        count: usize,
        weight_kg: f64,
        volume_l: f64,
    ) -> Vec<Self> {
        (0..count)
            .map(|_| Self::new(product_type.clone(), weight_kg, volume_l))
            .collect()
    }
}
