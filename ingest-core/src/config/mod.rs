//! Configuration loading and validation for the ingestion core.
//!
//! Configuration is loaded from multiple sources in order of precedence:
//! 1. Environment variables (highest)
//! 2. Environment-specific file (e.g., `development.toml`)
//! 3. Default file (`default.toml`)
//!
//! Per-chain RPC endpoints are the one exception: they come from the
//! irregularly-named `WS_RPC_URL_<CHAIN>` / `HTTP_RPC_URL_<CHAIN>`
//! variables, read directly rather than through the `INGEST__` prefix.
//!
//! # Example
//!
//! ```ignore
//! use ingest_core::config::Settings;
//!
//! let settings = Settings::load("development")?;
//! settings.validate().expect("invalid configuration");
//! println!("database: {}", settings.database.url);
//! ```

mod settings;

pub use settings::{
    BatchingSettings, ChainEndpoint, ChainsSettings, CatchupSettings, DatabaseSettings,
    DiscoverySettings, LoggingSettings, MetricsSettings, RabbitMqSettings, Settings,
    SubscriberLifecycleSettings,
};
