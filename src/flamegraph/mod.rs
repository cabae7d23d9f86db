//! Flamegraph generation from collapsed stacks.
//!
//! This module converts collapsed stacks into SVG flamegraphs and text
//! summaries showing where sampled threads spent their time.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
