use dispatch_order::ShippingRates;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shipping: ShippingRates,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Used when RUST_LOG is not set
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Also print shipment and pass events as JSON lines
    #[serde(default)]
    pub json_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json_events: false,
        }
    }
}

fn default_filter() -> String {
    "dispatch_daemon=info,dispatch_order=info,dispatch_catalog=info".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScenarioConfig {
    /// JSON scenario to replay; the built-in demo runs when unset
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `DISPATCH_SHIPPING__EXPRESS_BASE_FEE=9.5`
            .add_source(config::Environment::with_prefix("DISPATCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
