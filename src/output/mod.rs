//! Output writers for normalized traces and flamegraphs.
//!
//! - JSON normalized traces (profiles and custom event tables)
//! - SVG flamegraphs

pub mod json;
pub mod svg;

// Re-export main functions
pub use json::{read_output, validate_output_path, write_output};
pub use svg::write_svg;
