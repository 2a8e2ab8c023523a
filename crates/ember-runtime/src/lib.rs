//! # Ember Runtime
//!
//! Orchestration layer for the Ember bot: configuration, logging, and the
//! dispatch loop.
//!
//! [`EmberRuntime`] ties the pieces together: it loads and validates the
//! TOML/env configuration, initializes `tracing`, builds the shared
//! [`RuntimeContext`](ember_framework::RuntimeContext), loads plugins, and
//! then drives a single `select!` loop over the transport-fed inbound
//! channel, the internal timer, and the shutdown signal, publishing
//! `Startup` before the first dispatch and `Shutdown` after the last.
//!
//! ```rust,ignore
//! use ember_runtime::EmberRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = EmberRuntime::new();
//!     runtime.register_plugin(Arc::new(MyPlugin));
//!     runtime.spawn_signal_handler();
//!     runtime.run(inbound).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
mod pipeline;
pub mod runtime;

pub use config::{ConfigLoader, EmberConfig, load_config, load_config_from_file};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::EmberRuntime;
