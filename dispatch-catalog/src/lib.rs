pub mod product;
pub mod inventory;

pub use product::InventoryUnit;
pub use inventory::{InMemoryInventory, InventoryProvider};
