//! Configuration and constants for the parser and CLI.

use crate::utils::error::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Event type substrings treated as stack-sampling profiles
pub const DEFAULT_PROFILE_MATCHERS: &[&str] = &["ExecutionS", "Socket"];

/// Event type substrings treated as custom structured events
pub const DEFAULT_CUSTOM_EVENT_MATCHERS: &[&str] =
    &["LogContext", "MqFrm", "CPUEvent", "MemoryEvent"];

/// Stacks below this share of all samples fold into "other"
pub const DEFAULT_THRESHOLD: f64 = 0.005;

/// Sample window: 10 minutes in nanoseconds from the first sample
pub const DEFAULT_DURATION_NS: u64 = 600_000_000_000;

// Only parse 2 recordings concurrently + 10 waiting in the queue
pub const DEFAULT_MAX_PARALLEL: usize = 2;
pub const DEFAULT_MIN_WORKERS: usize = 1;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(300);

/// Nanoseconds per millisecond, the scale of every emitted time column
pub const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Identifier of the dedicated stack trace attribute on profile events
pub const STACK_TRACE_ATTRIBUTE: &str = "stackTrace";

/// Process-wide parser configuration
///
/// Immutable once handed to a parser; every field has a default so a
/// partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Substring matchers selecting profile (stack sample) event types
    pub profiles: Vec<String>,

    /// Substring matchers selecting custom structured event types
    pub custom_events: Vec<String>,

    /// Minimum share of samples a stack needs to be drawn on its own
    pub threshold: f64,

    /// Sample window length in nanoseconds (0 = unbounded)
    pub duration: u64,

    /// Maximum recordings parsed at once
    pub max_parallel: usize,

    /// Workers kept alive while idle
    pub min_workers: usize,

    /// Jobs allowed to wait for a free worker
    pub queue_capacity: usize,

    /// Idle time before a worker above `min_workers` retires
    pub keep_alive_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            profiles: DEFAULT_PROFILE_MATCHERS.iter().map(|s| s.to_string()).collect(),
            custom_events: DEFAULT_CUSTOM_EVENT_MATCHERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            threshold: DEFAULT_THRESHOLD,
            duration: DEFAULT_DURATION_NS,
            max_parallel: DEFAULT_MAX_PARALLEL,
            min_workers: DEFAULT_MIN_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            keep_alive_secs: DEFAULT_KEEP_ALIVE.as_secs(),
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    ///
    /// **Public** - used by the CLI `--config` flag
    ///
    /// # Errors
    /// * `ConfigError::ReadFailed` - file cannot be read
    /// * `ConfigError::InvalidJson` - malformed JSON
    /// * `ConfigError::InvalidValue` - values fail `validate`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading parser config from: {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        let config: ParserConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidValue(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }

        if self.max_parallel == 0 {
            return Err(ConfigError::InvalidValue(
                "max_parallel must be greater than 0".to_string(),
            ));
        }

        if self.min_workers > self.max_parallel {
            return Err(ConfigError::InvalidValue(format!(
                "min_workers ({}) cannot exceed max_parallel ({})",
                self.min_workers, self.max_parallel
            )));
        }

        if self.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "keep_alive_secs must be greater than 0".to_string(),
            ));
        }

        if self.profiles.iter().chain(&self.custom_events).any(|m| m.is_empty()) {
            // An empty matcher is contained in every identifier
            return Err(ConfigError::InvalidValue(
                "event type matchers cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_events<I, S>(mut self, custom_events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_events = custom_events.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = min_workers;
        self
    }

    pub fn with_keep_alive_secs(mut self, keep_alive_secs: u64) -> Self {
        self.keep_alive_secs = keep_alive_secs;
        self
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}
