pub mod ids;
pub mod events;

pub use ids::{OrderId, ProductType, ShipmentId, UnitId};
pub use events::{ChangeEvent, ChangeListener, ChangeSource, ListenerRegistry};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid product type: {0:?}")]
    InvalidProductType(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
