//! Configuration module for the Ember runtime.
//!
//! TOML-based configuration loading (figment: file + `EMBER_` env vars +
//! programmatic overrides) with validation before the runtime context is
//! built.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    BotConfig, EmberConfig, HistoryConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    TimingConfig,
};
pub use validation::validate_config;
