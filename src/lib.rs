//! JFR Normalizer
//!
//! Normalizes decoded Java Flight Recorder recordings into stack samples
//! and tabular custom event records.
//!
//! Event types are routed by substring matchers: profile types become
//! stack samples, custom types become records whose column schema is
//! built the first time the type is seen, and everything else is skipped.
//! Parses run on a bounded worker pool that refuses work with
//! `ParseError::Busy` once saturated.
//!
//! ## Getting Started
//!
//! ```bash
//! jfr-normalize parse --input recording.json --output normalized.json --flamegraph samples.svg
//! jfr-normalize classify --input recording.json
//! ```
//!
//! As a library:
//!
//! ```ignore
//! use jfr_normalizer::gateway::JfrParser;
//! use jfr_normalizer::handler::CollectingHandler;
//! use jfr_normalizer::utils::ParserConfig;
//!
//! let parser = JfrParser::new(ParserConfig::default())?;
//! let trace = parser.parse_path(CollectingHandler::new(), "recording.json")?.into_trace();
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod gateway;
pub mod handler;
pub mod output;
pub mod parser;
pub mod utils;
