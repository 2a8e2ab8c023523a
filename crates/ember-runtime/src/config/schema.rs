//! Configuration schema definitions.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ember_framework::RuntimeSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmberConfig {
    /// Bot identity and message routing settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Conversation window settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Timer and external-call timing settings.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-plugin config sections, keyed by plugin name. Opaque to the
    /// runtime; each plugin deserializes its own section.
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

impl EmberConfig {
    /// Derives the framework-level settings from this configuration.
    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            trigger_words: self.bot.trigger_words.clone(),
            command_marker: self.bot.command_marker,
            history_cap: self.history.max_length,
            consume_pinned: self.history.consume_pinned,
            expiry_threshold: Duration::from_secs(self.history.expiry_threshold_secs),
            superuser: self.bot.superuser.clone(),
            assistant_name: self.bot.assistant_name.clone(),
        }
    }
}

/// Bot identity and message routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Literal prefixes that mark a message as directed at the bot.
    #[serde(default = "default_trigger_words")]
    pub trigger_words: Vec<String>,

    /// Character after a trigger word that introduces a named command.
    #[serde(default = "default_command_marker")]
    pub command_marker: char,

    /// Operator identity plugins may address directly.
    #[serde(default)]
    pub superuser: Option<String>,

    /// Sender name recorded for the bot's own replies.
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Prefix prepended to every outgoing message.
    #[serde(default)]
    pub message_prefix: String,

    /// Inbound messages older than this are dropped before dispatch, so a
    /// restart does not replay a backlog.
    #[serde(default = "default_ignore_older_than")]
    pub ignore_messages_older_than_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            trigger_words: default_trigger_words(),
            command_marker: default_command_marker(),
            superuser: None,
            assistant_name: default_assistant_name(),
            message_prefix: String::new(),
            ignore_messages_older_than_secs: default_ignore_older_than(),
        }
    }
}

fn default_trigger_words() -> Vec<String> {
    vec!["!pot".into(), "!pothead".into(), "!ph".into()]
}

fn default_command_marker() -> char {
    '#'
}

fn default_assistant_name() -> String {
    "Assistant".to_string()
}

fn default_ignore_older_than() -> u64 {
    30
}

/// Conversation window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Per-chat rolling history cap.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Maximum gap in seconds between history entries still counted as one
    /// conversation when building AI context.
    #[serde(default = "default_expiry_threshold")]
    pub expiry_threshold_secs: u64,

    /// Whether pinned context is consumed after one AI call (`true`) or
    /// kept until explicitly cleared (`false`).
    #[serde(default = "default_consume_pinned")]
    pub consume_pinned: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            expiry_threshold_secs: default_expiry_threshold(),
            consume_pinned: default_consume_pinned(),
        }
    }
}

fn default_max_length() -> usize {
    30
}

fn default_expiry_threshold() -> u64 {
    300
}

fn default_consume_pinned() -> bool {
    true
}

/// Timer and external-call timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Seconds between timer events.
    #[serde(default = "default_timer_interval")]
    pub timer_interval_secs: u64,

    /// Bound in milliseconds for any single external call (command handler,
    /// AI reply, transport send).
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl TimingConfig {
    /// The external-call bound as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// The timer period as a [`Duration`].
    pub fn timer_interval(&self) -> Duration {
        Duration::from_secs(self.timer_interval_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            timer_interval_secs: default_timer_interval(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

fn default_timer_interval() -> u64 {
    60
}

fn default_call_timeout_ms() -> u64 {
    30000
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as a lowercase directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to the tracing level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// Full format with all span fields.
    Full,
    /// Multi-line human-friendly format.
    Pretty,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output (default).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Include thread IDs in log output.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of the log site.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module level overrides, e.g. `ember_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
