//! Trace loading.
//!
//! `TraceLoader` is the seam to the recording decoder: anything that can
//! turn a file or a byte buffer into an `EventCollection` can drive the
//! normalizer. `JsonTraceLoader` reads recordings already dumped to JSON:
//!
//! ```json
//! {"groups": [{
//!     "identifier": "jdk.ExecutionSample",
//!     "attributes": [{"identifier": "startTime", "kind": "timestamp", "unit": "epoch_ns"}],
//!     "events": [{"startTime": 1700000000000000000}]
//! }]}
//! ```
//!
//! A bare array of groups is accepted as well.

use super::event::{
    Attribute, ContentKind, EventCollection, EventGroup, EventType, FieldValue, Numeric, Quantity,
    StackTrace, ThreadRef, TraceEvent,
};
use super::units::Unit;
use crate::utils::error::ParseError;
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Decoder from raw recording bytes to events grouped by type
pub trait TraceLoader: Send + Sync + 'static {
    fn load_bytes(&self, bytes: &[u8]) -> Result<EventCollection, ParseError>;

    fn load_path(&self, path: &Path) -> Result<EventCollection, ParseError> {
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes)
    }
}

/// Where a parse job reads its recording from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl TraceSource {
    pub fn load(&self, loader: &dyn TraceLoader) -> Result<EventCollection, ParseError> {
        match self {
            TraceSource::Path(path) => loader.load_path(path),
            TraceSource::Bytes(bytes) => loader.load_bytes(bytes),
        }
    }

    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            TraceSource::Path(path) => path.display().to_string(),
            TraceSource::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

/// Loader for JSON-dumped recordings
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTraceLoader;

impl JsonTraceLoader {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    identifier: String,
    #[serde(default)]
    attributes: Vec<Attribute>,
    #[serde(default)]
    events: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRecording {
    Wrapped { groups: Vec<RawGroup> },
    Bare(Vec<RawGroup>),
}

/// Quantity with a per-event unit override
#[derive(Debug, Deserialize)]
struct RawQuantity {
    value: Numeric,
    unit: Option<Unit>,
}

impl TraceLoader for JsonTraceLoader {
    fn load_bytes(&self, bytes: &[u8]) -> Result<EventCollection, ParseError> {
        let recording: RawRecording = serde_json::from_slice(bytes)
            .map_err(|e| ParseError::Decode(format!("invalid recording JSON: {}", e)))?;

        let raw_groups = match recording {
            RawRecording::Wrapped { groups } => groups,
            RawRecording::Bare(groups) => groups,
        };

        let groups = raw_groups
            .into_iter()
            .map(decode_group)
            .collect::<Result<Vec<_>, _>>()?;

        let collection = EventCollection::new(groups);
        debug!(
            "Loaded {} event groups with {} events",
            collection.groups.len(),
            collection.event_count()
        );
        Ok(collection)
    }
}

fn decode_group(raw: RawGroup) -> Result<EventGroup, ParseError> {
    let event_type = EventType::new(raw.identifier, raw.attributes);

    let events = raw
        .events
        .iter()
        .enumerate()
        .map(|(index, fields)| {
            decode_event(&event_type, fields).map_err(|reason| {
                ParseError::Decode(format!(
                    "{} event {}: {}",
                    event_type.identifier, index, reason
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EventGroup::new(event_type, events))
}

fn decode_event(event_type: &EventType, fields: &Map<String, Value>) -> Result<TraceEvent, String> {
    let mut event = TraceEvent::new();

    for attribute in &event_type.attributes {
        let Some(raw) = fields.get(&attribute.identifier) else {
            continue;
        };
        if raw.is_null() {
            continue;
        }
        if let Some(value) = decode_value(attribute, raw)? {
            event.insert(attribute.identifier.clone(), value);
        }
    }

    Ok(event)
}

/// Interpret a JSON value according to the attribute's content kind
fn decode_value(attribute: &Attribute, raw: &Value) -> Result<Option<FieldValue>, String> {
    let mismatch = |expected: &str| {
        format!(
            "attribute '{}' expected {}, found {}",
            attribute.identifier, expected, raw
        )
    };

    let value = match attribute.kind {
        ContentKind::Thread => match raw {
            Value::Number(n) => {
                let id = n.as_i64().ok_or_else(|| mismatch("thread id"))?;
                FieldValue::Thread(ThreadRef::new(id, ""))
            }
            Value::Object(_) => FieldValue::Thread(
                ThreadRef::deserialize(raw).map_err(|_| mismatch("thread object"))?,
            ),
            _ => return Err(mismatch("thread")),
        },
        ContentKind::Timestamp | ContentKind::Timespan | ContentKind::Number => {
            let unit = attribute.effective_unit();
            match raw {
                Value::Number(_) => FieldValue::Quantity(Quantity {
                    value: Numeric::deserialize(raw).map_err(|_| mismatch("number"))?,
                    unit,
                }),
                Value::Object(_) => {
                    let q = RawQuantity::deserialize(raw).map_err(|_| mismatch("quantity"))?;
                    FieldValue::Quantity(Quantity {
                        value: q.value,
                        unit: q.unit.unwrap_or(unit),
                    })
                }
                _ => return Err(mismatch("number")),
            }
        }
        ContentKind::Text => match raw {
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Bool(_) | Value::Number(_) => FieldValue::Text(raw.to_string()),
            _ => return Err(mismatch("text")),
        },
        ContentKind::StackTrace => FieldValue::StackTrace(
            StackTrace::deserialize(raw).map_err(|_| mismatch("stack trace"))?,
        ),
        // Not interpreted by anyone downstream
        ContentKind::Other => return Ok(None),
    };

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(value: Value) -> Result<EventCollection, ParseError> {
        JsonTraceLoader::new().load_bytes(value.to_string().as_bytes())
    }

    #[test]
    fn test_load_wrapped_recording() {
        let collection = load(json!({
            "groups": [{
                "identifier": "jdk.ExecutionSample",
                "attributes": [
                    {"identifier": "startTime", "kind": "timestamp"},
                    {"identifier": "sampledThread", "kind": "thread"},
                    {"identifier": "stackTrace", "kind": "stacktrace"}
                ],
                "events": [{
                    "startTime": 1700000000000000000i64,
                    "sampledThread": {"id": 12, "name": "worker-1"},
                    "stackTrace": {"frames": [{"method": "run", "type": "Worker"}]}
                }]
            }]
        }))
        .unwrap();

        let group = &collection.groups[0];
        let event = &group.events[0];
        let attrs = &group.event_type.attributes;

        assert_eq!(event.quantity(&attrs[0]).map(|q| q.unit), Some(Unit::EpochNanos));
        assert_eq!(event.thread(&attrs[1]).map(|t| t.name.as_str()), Some("worker-1"));
        assert_eq!(event.stack_trace(&attrs[2]).map(|s| s.frames.len()), Some(1));
    }

    #[test]
    fn test_load_bare_array_and_unit_override() {
        let collection = load(json!([{
            "identifier": "app.CPUEvent",
            "attributes": [
                {"identifier": "duration", "kind": "timespan", "unit": "ms"},
                {"identifier": "address", "kind": "memoryaddress"}
            ],
            "events": [
                {"duration": {"value": 5, "unit": "s"}, "address": 4096},
                {"duration": null}
            ]
        }]))
        .unwrap();

        let group = &collection.groups[0];
        let duration = &group.event_type.attributes[0];
        assert_eq!(group.event_type.attributes[1].kind, ContentKind::Other);
        assert_eq!(group.events[0].quantity(duration).map(|q| q.unit), Some(Unit::Seconds));
        assert!(group.events[1].quantity(duration).is_none());
    }

    #[test]
    fn test_type_mismatch_is_decode_error() {
        let err = load(json!({
            "groups": [{
                "identifier": "app.LogContext",
                "attributes": [{"identifier": "startTime", "kind": "timestamp"}],
                "events": [{"startTime": "yesterday"}]
            }]
        }))
        .unwrap_err();

        assert!(matches!(err, ParseError::Decode(msg) if msg.contains("app.LogContext event 0")));
    }

    #[test]
    fn test_garbage_bytes_are_decode_error() {
        let err = JsonTraceLoader::new().load_bytes(b"\x00\x01FLR").unwrap_err();
        assert!(matches!(err, ParseError::Decode(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = JsonTraceLoader::new()
            .load_path(Path::new("/nonexistent/recording.json"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Io(_)));
    }
}
