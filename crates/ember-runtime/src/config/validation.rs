//! Configuration validation.
//!
//! Runs after loading, before the runtime context is built. Everything here
//! is a startup-time failure: a config that validates is one the dispatch
//! loop can run against without surprises.

use super::error::{ConfigError, ConfigResult};
use super::schema::EmberConfig;

/// Validates a loaded configuration.
pub fn validate_config(config: &EmberConfig) -> ConfigResult<()> {
    if config.bot.trigger_words.is_empty() {
        return Err(ConfigError::validation(
            "bot.trigger_words must not be empty",
        ));
    }
    for word in &config.bot.trigger_words {
        if word.trim().is_empty() {
            return Err(ConfigError::validation(
                "bot.trigger_words must not contain blank entries",
            ));
        }
    }

    let marker = config.bot.command_marker;
    if marker.is_alphanumeric() || marker.is_whitespace() {
        return Err(ConfigError::validation(format!(
            "bot.command_marker '{marker}' must be a punctuation character"
        )));
    }

    if config.history.max_length == 0 {
        return Err(ConfigError::validation("history.max_length must be >= 1"));
    }

    if config.timing.timer_interval_secs == 0 {
        return Err(ConfigError::validation(
            "timing.timer_interval_secs must be >= 1",
        ));
    }
    if config.timing.call_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "timing.call_timeout_ms must be >= 1",
        ));
    }

    Ok(())
}
