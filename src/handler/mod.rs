//! Output sink for normalized events.
//!
//! The normalization driver pushes everything it produces through
//! `EventHandler`. Call order per parse session:
//! - profile types: `initialize_profile` and `initialize_pid` once, then
//!   one `process_event` per sample
//! - custom types: `initialize_event` and `add_header` once, before the
//!   first `process_context`

pub mod collect;

use crate::parser::{Record, StackTrace};

pub use collect::{CollectingHandler, ContextRecord, EventTable, NormalizedTrace, StackSample};

/// Callback surface receiving normalized records
pub trait EventHandler {
    /// A profile type is about to deliver its first sample
    fn initialize_profile(&mut self, type_id: &str);

    /// Per-type process bookkeeping, called right after `initialize_profile`
    fn initialize_pid(&mut self, type_id: &str);

    /// One stack sample
    ///
    /// `buffer` is scratch space owned by the parse session and reused
    /// across samples; handlers may use it to format frames without
    /// allocating per sample.
    fn process_event(
        &mut self,
        buffer: &mut String,
        stack_trace: &StackTrace,
        type_id: &str,
        thread_id: i64,
        epoch_timestamp: i64,
    );

    /// A custom type is about to deliver its header
    fn initialize_event(&mut self, type_id: &str);

    /// Column names (`name:tag`) in record order
    fn add_header(&mut self, type_id: &str, columns: &[String]);

    /// One custom event record
    fn process_context(&mut self, record: Record, thread_id: i64, type_id: &str);
}
