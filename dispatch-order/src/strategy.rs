use crate::models::{Order, ShippingCare, ShippingMethod};
use serde::{Deserialize, Serialize};

/// Pluggable shipping cost calculation
pub trait CostStrategy: Send + Sync {
    /// Name reported alongside the shipment
    fn name(&self) -> &'static str;

    /// Cost contribution for `order`, given its total weight (kg) and size (litres)
    fn compute_cost(&self, order: &Order, weight_kg: f64, volume_l: f64) -> f64;
}

/// Rate card used to build the cost strategies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShippingRates {
    pub ground_base_fee: f64,
    pub ground_per_kg: f64,
    pub ground_per_litre: f64,

    pub express_base_fee: f64,
    pub express_per_kg: f64,
    pub express_per_litre: f64,

    /// Handling fee charged per fragile line item
    pub fragile_per_item: f64,
    pub fragile_per_kg: f64,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            ground_base_fee: 4.99,
            ground_per_kg: 0.50,
            ground_per_litre: 0.05,
            express_base_fee: 14.99,
            express_per_kg: 1.25,
            express_per_litre: 0.10,
            fragile_per_item: 2.00,
            fragile_per_kg: 0.75,
        }
    }
}

impl ShippingRates {
    pub fn method_strategy(&self, method: ShippingMethod) -> Box<dyn CostStrategy> {
        match method {
            ShippingMethod::Ground => Box::new(GroundShipping {
                base_fee: self.ground_base_fee,
                per_kg: self.ground_per_kg,
                per_litre: self.ground_per_litre,
            }),
            ShippingMethod::Express => Box::new(ExpressShipping {
                base_fee: self.express_base_fee,
                per_kg: self.express_per_kg,
                per_litre: self.express_per_litre,
            }),
        }
    }

    pub fn care_strategy(&self, care: ShippingCare) -> Box<dyn CostStrategy> {
        match care {
            ShippingCare::Standard => Box::new(StandardCare),
            ShippingCare::Fragile => Box::new(FragileCare {
                per_item: self.fragile_per_item,
                per_kg: self.fragile_per_kg,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroundShipping {
    pub base_fee: f64,
    pub per_kg: f64,
    pub per_litre: f64,
}

impl CostStrategy for GroundShipping {
    fn name(&self) -> &'static str {
        "GroundShipping"
    }

    fn compute_cost(&self, _order: &Order, weight_kg: f64, volume_l: f64) -> f64 {
        self.base_fee + weight_kg * self.per_kg + volume_l * self.per_litre
    }
}

#[derive(Debug, Clone)]
pub struct ExpressShipping {
    pub base_fee: f64,
    pub per_kg: f64,
    pub per_litre: f64,
}

impl CostStrategy for ExpressShipping {
    fn name(&self) -> &'static str {
        "ExpressShipping"
    }

    fn compute_cost(&self, _order: &Order, weight_kg: f64, volume_l: f64) -> f64 {
        // Billed on whichever is larger: actual or volumetric weight (5 l per kg)
        let billable_kg = weight_kg.max(volume_l / 5.0);
        self.base_fee + billable_kg * self.per_kg + volume_l * self.per_litre
    }
}

/// No handling surcharge
#[derive(Debug, Clone, Copy)]
pub struct StandardCare;

impl CostStrategy for StandardCare {
    fn name(&self) -> &'static str {
        "StandardCare"
    }

    fn compute_cost(&self, _order: &Order, _weight_kg: f64, _volume_l: f64) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct FragileCare {
    pub per_item: f64,
    pub per_kg: f64,
}

impl CostStrategy for FragileCare {
    fn name(&self) -> &'static str {
        "FragileCare"
    }

    fn compute_cost(&self, order: &Order, weight_kg: f64, _volume_l: f64) -> f64 {
        order.items.len() as f64 * self.per_item + weight_kg * self.per_kg
    }
}
