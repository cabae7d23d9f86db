//! JSON writer for normalized traces.

use crate::handler::NormalizedTrace;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write a normalized trace to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `trace` - Collected samples and custom event tables
/// * `output_path` - Destination file; parent directories are created
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
pub fn write_output(trace: &NormalizedTrace, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing normalized trace to: {}", output_path.display());

    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, trace).map_err(OutputError::SerializationFailed)?;

    info!(
        "Normalized trace written ({} samples, {} records, {} bytes)",
        trace.sample_count(),
        trace.record_count(),
        file_size(output_path)
    );

    Ok(())
}

/// Read a normalized trace back from JSON
///
/// # Errors
/// * `OutputError::ReadFailed` - file cannot be opened
/// * `OutputError::SerializationFailed` - not a normalized trace
pub fn read_output(input_path: impl AsRef<Path>) -> Result<NormalizedTrace, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading normalized trace from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::ReadFailed)?;
    let trace: NormalizedTrace =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Trace loaded: version {}, {} profile types, {} event types",
        trace.version,
        trace.profiles.len(),
        trace.events.len()
    );

    Ok(trace)
}

/// Reject empty paths and existing directories
///
/// **Public** - shared with the SVG writer and CLI argument checks
pub fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

pub(crate) fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ContextRecord, EventTable, StackSample};
    use crate::parser::{Frame, Record, StackTrace, Value};
    use std::collections::BTreeMap;
    use tempfile::NamedTempFile;

    fn create_test_trace() -> NormalizedTrace {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "jdk.ExecutionSample".to_string(),
            vec![StackSample {
                thread_id: 7,
                epoch_timestamp: 1_700_000_000_000_000_000,
                stack_trace: StackTrace::new(vec![Frame {
                    method: "run".to_string(),
                    type_name: Some("java.lang.Thread".to_string()),
                    line: Some(834),
                }]),
                event_type: "jdk.ExecutionSample".to_string(),
            }],
        );

        let mut events = BTreeMap::new();
        events.insert(
            "app.LogContext".to_string(),
            EventTable {
                header: vec![
                    "tid:number".to_string(),
                    "timestamp:timestamp".to_string(),
                    "message:text".to_string(),
                ],
                records: vec![ContextRecord {
                    thread_id: 7,
                    values: Record::new(vec![
                        Value::Number(7),
                        Value::Timestamp(1_700_000_000_000),
                        Value::Text("hello".to_string()),
                    ]),
                }],
            },
        );

        NormalizedTrace {
            version: "1.0.0".to_string(),
            generated_at: "2024-01-01T00:00:00Z".to_string(),
            profiles,
            events,
        }
    }

    #[test]
    fn test_write_and_read_output() {
        let trace = create_test_trace();
        let temp_file = NamedTempFile::new().unwrap();

        write_output(&trace, temp_file.path()).unwrap();
        let loaded = read_output(temp_file.path()).unwrap();

        assert_eq!(loaded, trace);
        assert_eq!(
            loaded.events["app.LogContext"].records[0].values.values()[1],
            Value::Timestamp(1_700_000_000_000)
        );
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_output(temp_dir.path().join("missing.json")),
            Err(OutputError::ReadFailed(_))
        ));
    }

    #[test]
    fn test_validate_output_path_empty() {
        assert!(validate_output_path(Path::new("")).is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/trace.json");

        write_output(&create_test_trace(), &nested_path).unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_read_rejects_foreign_json() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "{\"samples\": 1}").unwrap();

        assert!(matches!(
            read_output(temp_file.path()),
            Err(OutputError::SerializationFailed(_))
        ));
    }
}
