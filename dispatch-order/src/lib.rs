pub mod models;
pub mod book;
pub mod strategy;
pub mod shipping;
pub mod fulfillment;
pub mod reconciler;

pub use models::{LineItem, Order, ShippingCare, ShippingMethod};
pub use book::{OrderBook, OrderError, OrderQueueProvider};
pub use strategy::{CostStrategy, ShippingRates};
pub use shipping::{ShipmentError, ShipmentExecutor, ShipmentListener, ShipmentRecord};
pub use fulfillment::{
    Allocation, FulfillmentMatcher, MatchOutcome, Shortage, Unshippable, UnshippableReason,
};
pub use reconciler::{ReconcileReport, Reconciler, ShippedOrder, SkippedShipment, Snapshot};
