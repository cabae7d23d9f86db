//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::parser::units::Unit;
use thiserror::Error;

/// Errors that can occur while submitting or running a parse job
#[derive(Error, Debug)]
pub enum ParseError {
    /// Worker pool and queue are saturated. No work was started.
    #[error("JFR parser is busy please try after some time")]
    Busy,

    #[error("Could not decode recording: {0}")]
    Decode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker running the job died before delivering a result
    #[error("Parse worker terminated before completing the job")]
    WorkerLost,
}

impl ParseError {
    /// True when the job was shed by admission control rather than failing
    pub fn is_busy(&self) -> bool {
        matches!(self, ParseError::Busy)
    }
}

/// Errors from unit arithmetic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Cannot convert from {from} to {to}")]
    Incommensurable { from: Unit, to: Unit },
}

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to read file: {0}")]
    ReadFailed(std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors raised by the bounded worker pool
#[derive(Error, Debug)]
pub enum PoolError {
    /// Every worker is busy and the queue is full
    #[error("Worker pool is saturated")]
    Busy,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker pool is shut down")]
    ShutDown,

    #[error("Failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The task panicked before producing its result
    #[error("Task panicked")]
    TaskPanicked,
}

impl From<PoolError> for ParseError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Busy => ParseError::Busy,
            PoolError::InvalidConfig(msg) => ParseError::InvalidArgument(msg),
            PoolError::SpawnFailed(e) => ParseError::Io(e),
            PoolError::ShutDown | PoolError::TaskPanicked => ParseError::WorkerLost,
        }
    }
}
