//! Parse gateway: bounded, synchronous entry point for parse jobs.
//!
//! Callers submit a handler plus a recording source and block until the job
//! finishes on a pool worker. When the pool and its queue are saturated the
//! job is refused with `ParseError::Busy` instead of waiting, which callers
//! can tell apart from a recording that failed to decode.

pub mod pool;

pub use pool::{PoolConfig, WorkerPool};

use crate::aggregator::Normalizer;
use crate::handler::EventHandler;
use crate::parser::{JsonTraceLoader, TraceLoader, TraceSource};
use crate::utils::config::ParserConfig;
use crate::utils::error::{ParseError, PoolError};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// One parse request
///
/// Both parts are required; a job missing either is rejected with
/// `ParseError::InvalidArgument` before reaching the pool.
#[derive(Debug)]
pub struct ParseJob<H> {
    handler: Option<H>,
    source: Option<TraceSource>,
}

impl<H> Default for ParseJob<H> {
    fn default() -> Self {
        Self {
            handler: None,
            source: None,
        }
    }
}

impl<H> ParseJob<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(handler: H, bytes: Vec<u8>) -> Self {
        Self::new().with_handler(handler).with_source(TraceSource::Bytes(bytes))
    }

    pub fn from_path(handler: H, path: impl Into<PathBuf>) -> Self {
        Self::new()
            .with_handler(handler)
            .with_source(TraceSource::Path(path.into()))
    }

    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_source(mut self, source: TraceSource) -> Self {
        self.source = Some(source);
        self
    }

    fn into_parts(self) -> Result<(H, TraceSource), ParseError> {
        let handler = self
            .handler
            .ok_or_else(|| ParseError::InvalidArgument("null/empty handler argument".to_string()))?;
        let source = self
            .source
            .ok_or_else(|| ParseError::InvalidArgument("null/empty source argument".to_string()))?;

        if let TraceSource::Path(path) = &source {
            if path.as_os_str().is_empty() {
                return Err(ParseError::InvalidArgument(
                    "null/empty path argument".to_string(),
                ));
            }
        }

        Ok((handler, source))
    }
}

/// Concurrency-capped recording parser
pub struct JfrParser {
    pool: WorkerPool,
    loader: Arc<dyn TraceLoader>,
    normalizer: Arc<Normalizer>,
    config: ParserConfig,
}

impl JfrParser {
    /// Parser reading JSON-dumped recordings
    ///
    /// # Errors
    /// * `ParseError::InvalidArgument` - configuration fails validation
    pub fn new(config: ParserConfig) -> Result<Self, ParseError> {
        Self::with_loader(config, JsonTraceLoader::new())
    }

    /// Parser using a custom recording decoder
    pub fn with_loader<L: TraceLoader>(config: ParserConfig, loader: L) -> Result<Self, ParseError> {
        config
            .validate()
            .map_err(|e| ParseError::InvalidArgument(e.to_string()))?;

        debug!(
            "Parser config: {}",
            serde_json::to_string(&config).unwrap_or_default()
        );

        let pool_config = PoolConfig::new(config.max_parallel)
            .with_min_workers(config.min_workers)
            .with_queue_capacity(config.queue_capacity)
            .with_keep_alive(config.keep_alive());

        Ok(Self {
            pool: WorkerPool::new(pool_config)?,
            loader: Arc::new(loader),
            normalizer: Arc::new(Normalizer::from_config(&config)),
            config,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse an in-memory recording
    pub fn parse_stream<H>(&self, handler: H, bytes: Vec<u8>) -> Result<H, ParseError>
    where
        H: EventHandler + Send + 'static,
    {
        self.submit_parse(ParseJob::from_bytes(handler, bytes))
    }

    /// Parse a recording file
    pub fn parse_path<H>(&self, handler: H, path: impl Into<PathBuf>) -> Result<H, ParseError>
    where
        H: EventHandler + Send + 'static,
    {
        self.submit_parse(ParseJob::from_path(handler, path))
    }

    /// Run a job on the pool and block until it finishes or is refused
    ///
    /// **Public** - main entry point of the gateway
    ///
    /// # Returns
    /// The job's handler, populated with every normalized record
    ///
    /// # Errors
    /// * `ParseError::InvalidArgument` - handler or source missing
    /// * `ParseError::Busy` - pool and queue saturated, retry later
    /// * `ParseError::Decode` / `ParseError::Io` - recording unreadable
    /// * `ParseError::WorkerLost` - the job panicked on its worker
    pub fn submit_parse<H>(&self, job: ParseJob<H>) -> Result<H, ParseError>
    where
        H: EventHandler + Send + 'static,
    {
        let (handler, source) = job.into_parts()?;
        let loader = Arc::clone(&self.loader);
        let normalizer = Arc::clone(&self.normalizer);

        match self
            .pool
            .execute(move || run_job(loader.as_ref(), &normalizer, handler, &source))
        {
            Ok(result) => result,
            Err(PoolError::Busy) => {
                warn!("JFR parser is busy please try after some time");
                Err(ParseError::Busy)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Jobs running or queued right now
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }
}

fn run_job<H: EventHandler>(
    loader: &dyn TraceLoader,
    normalizer: &Normalizer,
    mut handler: H,
    source: &TraceSource,
) -> Result<H, ParseError> {
    let timer = Instant::now();

    let events = source.load(loader)?;
    let stats = normalizer.run(&events, &mut handler);

    info!(
        "Parsed {} in {:.2}s: {} samples ({} outside window), {} records",
        source.describe(),
        timer.elapsed().as_secs_f64(),
        stats.profile_samples,
        stats.dropped_samples,
        stats.custom_records
    );

    Ok(handler)
}
