pub mod models;
pub mod pii;

pub use models::events::{ReconciliationCompletedEvent, ShipmentDispatchedEvent};
pub use pii::Masked;
