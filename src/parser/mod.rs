//! Event model, classification, schema inference and field extraction.
//!
//! This module handles:
//! - The in-memory event model delivered by a trace loader
//! - Unit-aware quantity arithmetic
//! - Classifying event types as profile, custom or ignored
//! - Building column schemas on first sight of a custom type
//! - Extracting unit-normalized records

pub mod classifier;
pub mod event;
pub mod extractor;
pub mod loader;
pub mod schema;
pub mod units;

// Re-export main types
pub use classifier::{Classification, TypeClassifier};
pub use event::{
    Attribute, ContentKind, EventCollection, EventGroup, EventType, FieldValue, Frame, Numeric,
    Quantity, StackTrace, ThreadRef, TraceEvent,
};
pub use extractor::{convert_timespan, extract_record, Extracted, Record, Value, UNRESOLVED_THREAD_ID};
pub use loader::{JsonTraceLoader, TraceLoader, TraceSource};
pub use schema::{Column, ColumnSchema, SchemaRegistry, SemanticTag};
pub use units::{Dimension, Unit};
