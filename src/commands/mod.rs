//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components to perform user tasks.

pub mod classify;
pub mod parse;

// Re-export main command functions
pub use classify::{classify_recording, execute_classify, TypeRoute};
pub use parse::{execute_parse, load_config, validate_args, ParseArgs};
