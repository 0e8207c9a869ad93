pub mod app_config;
pub mod scenario;
pub mod state;
pub mod worker;

pub use app_config::Config;
pub use state::AppState;
