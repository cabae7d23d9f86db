//! Normalization of decoded recordings and aggregation of samples.
//!
//! This module turns an `EventCollection` into:
//! - Handler callbacks (stack samples, headers, custom records)
//! - Collapsed stacks (for flamegraph generation)

pub mod driver;
pub mod stack_builder;

// Re-export main types and functions
pub use driver::{process_events, Normalizer, SampleWindow, SessionStats, UNRESOLVED_TIMESTAMP};
pub use stack_builder::{build_collapsed_stacks, merge_small_stacks, CollapsedStack};
