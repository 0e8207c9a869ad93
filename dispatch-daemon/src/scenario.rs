use anyhow::Context;
use dispatch_catalog::{InMemoryInventory, InventoryUnit};
use dispatch_core::ProductType;
use dispatch_order::{LineItem, Order, OrderBook, ShippingCare, ShippingMethod};
use serde::Deserialize;
use std::path::Path;

/// Scripted sequence of restocks and order placements
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Restock(RestockStep),
    PlaceOrder(PlaceOrderStep),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestockStep {
    pub product_type: ProductType,
    pub count: usize,
    pub weight_kg: f64,
    pub volume_l: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderStep {
    pub customer_id: String,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub care: ShippingCare,
    #[serde(default)]
    pub method: ShippingMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemSpec {
    pub product_type: ProductType,
    #[serde(default = "one")]
    pub quantity: usize,
    pub weight_kg: f64,
    pub volume_l: f64,
}

fn one() -> usize {
    1
}

impl PlaceOrderStep {
    pub fn to_order(&self) -> Order {
        let items = self
            .items
            .iter()
            .flat_map(|spec| {
                std::iter::repeat_with(|| {
                    LineItem::new(spec.product_type.clone(), spec.weight_kg, spec.volume_l)
                })
                .take(spec.quantity)
            })
            .collect();
        Order::new(self.customer_id.clone(), items, self.care, self.method)
    }
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Electronics shop demo: orders arrive before and after stock does
    pub fn demo() -> anyhow::Result<Self> {
        Self::from_json(DEMO).context("parsing built-in demo scenario")
    }

    /// Apply every step in order. Providers notify their listeners as usual.
    pub fn apply(&self, inventory: &InMemoryInventory, book: &OrderBook) -> anyhow::Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::Restock(restock) => {
                    inventory.restock(InventoryUnit::batch(
                        &restock.product_type,
                        restock.count,
                        restock.weight_kg,
                        restock.volume_l,
                    ));
                }
                Step::PlaceOrder(place) => {
                    book.place(place.to_order())
                        .with_context(|| format!("scenario step {}", index))?;
                }
            }
        }
        Ok(())
    }
}

const DEMO: &str = r#"{
  "steps": [
    { "restock": { "product_type": "Laptop", "count": 2, "weight_kg": 2.2, "volume_l": 9.0 } },
    { "restock": { "product_type": "Smartphone", "count": 1, "weight_kg": 0.3, "volume_l": 0.8 } },
    { "place_order": {
        "customer_id": "ada@example.com",
        "items": [
          { "product_type": "Laptop", "weight_kg": 2.2, "volume_l": 9.0 },
          { "product_type": "Smartphone", "weight_kg": 0.3, "volume_l": 0.8 }
        ],
        "care": "FRAGILE",
        "method": "EXPRESS"
    } },
    { "place_order": {
        "customer_id": "grace@example.com",
        "items": [ { "product_type": "Laptop", "weight_kg": 2.2, "volume_l": 9.0 } ]
    } },
    { "place_order": {
        "customer_id": "linus@example.com",
        "items": [ { "product_type": "Television", "quantity": 1, "weight_kg": 14.0, "volume_l": 120.0 } ],
        "care": "FRAGILE"
    } },
    { "place_order": { "customer_id": "ken@example.com", "items": [] } },
    { "restock": { "product_type": "Television", "count": 1, "weight_kg": 14.0, "volume_l": 120.0 } }
  ]
}"#;
