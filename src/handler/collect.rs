//! In-memory handler collecting everything into a serializable trace.

use super::EventHandler;
use crate::parser::{Record, SemanticTag, StackTrace, Value};
use crate::utils::config::SCHEMA_VERSION;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One profile sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSample {
    pub thread_id: i64,

    /// Raw timestamp in the recording's native unit
    pub epoch_timestamp: i64,

    pub stack_trace: StackTrace,

    pub event_type: String,
}

/// One custom event record with its thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub thread_id: i64,
    pub values: Record,
}

/// Header and records of one custom event type
///
/// Timestamp and number cells share one JSON shape. On read, numeric cells
/// under a `:timestamp` header column become `Value::Timestamp` again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEventTable")]
pub struct EventTable {
    pub header: Vec<String>,
    pub records: Vec<ContextRecord>,
}

#[derive(Deserialize)]
struct RawEventTable {
    header: Vec<String>,
    records: Vec<ContextRecord>,
}

impl From<RawEventTable> for EventTable {
    fn from(raw: RawEventTable) -> Self {
        let timestamp_columns: Vec<bool> = raw.header.iter().map(|h| is_timestamp_column(h)).collect();

        let records = raw
            .records
            .into_iter()
            .map(|record| {
                let values = record
                    .values
                    .into_values()
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| match value {
                        Value::Number(n) if timestamp_columns.get(i).copied().unwrap_or(false) => {
                            Value::Timestamp(n)
                        }
                        other => other,
                    })
                    .collect();
                ContextRecord {
                    thread_id: record.thread_id,
                    values: Record::new(values),
                }
            })
            .collect();

        Self {
            header: raw.header,
            records,
        }
    }
}

fn is_timestamp_column(header: &str) -> bool {
    header
        .rsplit_once(':')
        .map_or(false, |(_, tag)| tag == SemanticTag::Timestamp.to_string())
}

/// Top-level normalized output written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTrace {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the output was generated
    pub generated_at: String,

    /// Stack samples by profile type
    pub profiles: BTreeMap<String, Vec<StackSample>>,

    /// Tables by custom event type
    pub events: BTreeMap<String, EventTable>,
}

impl NormalizedTrace {
    pub fn sample_count(&self) -> usize {
        self.profiles.values().map(Vec::len).sum()
    }

    pub fn record_count(&self) -> usize {
        self.events.values().map(|t| t.records.len()).sum()
    }

    /// All samples across profile types
    pub fn samples(&self) -> impl Iterator<Item = &StackSample> {
        self.profiles.values().flatten()
    }
}

/// Handler that keeps every callback's payload in memory
#[derive(Debug, Default)]
pub struct CollectingHandler {
    profiles: BTreeMap<String, Vec<StackSample>>,
    pids: BTreeSet<String>,
    events: BTreeMap<String, EventTable>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profiles(&self) -> &BTreeMap<String, Vec<StackSample>> {
        &self.profiles
    }

    pub fn events(&self) -> &BTreeMap<String, EventTable> {
        &self.events
    }

    /// Profile types that went through `initialize_pid`
    pub fn pid_types(&self) -> &BTreeSet<String> {
        &self.pids
    }

    /// Finish collection, stamping version and generation time
    pub fn into_trace(self) -> NormalizedTrace {
        NormalizedTrace {
            version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            profiles: self.profiles,
            events: self.events,
        }
    }
}

impl EventHandler for CollectingHandler {
    fn initialize_profile(&mut self, type_id: &str) {
        self.profiles.entry(type_id.to_string()).or_default();
    }

    fn initialize_pid(&mut self, type_id: &str) {
        self.pids.insert(type_id.to_string());
    }

    fn process_event(
        &mut self,
        _buffer: &mut String,
        stack_trace: &StackTrace,
        type_id: &str,
        thread_id: i64,
        epoch_timestamp: i64,
    ) {
        self.profiles
            .entry(type_id.to_string())
            .or_default()
            .push(StackSample {
                thread_id,
                epoch_timestamp,
                stack_trace: stack_trace.clone(),
                event_type: type_id.to_string(),
            });
    }

    fn initialize_event(&mut self, type_id: &str) {
        self.events.entry(type_id.to_string()).or_default();
    }

    fn add_header(&mut self, type_id: &str, columns: &[String]) {
        self.events.entry(type_id.to_string()).or_default().header = columns.to_vec();
    }

    fn process_context(&mut self, record: Record, thread_id: i64, type_id: &str) {
        let table = self.events.entry(type_id.to_string()).or_default();
        if table.header.len() != record.len() {
            warn!(
                "Record for {} has {} values but header has {} columns",
                type_id,
                record.len(),
                table.header.len()
            );
        }
        table.records.push(ContextRecord {
            thread_id,
            values: record,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Frame;

    #[test]
    fn test_collects_samples_by_type() {
        let mut handler = CollectingHandler::new();
        let mut buffer = String::new();
        let trace = StackTrace::new(vec![Frame::new("run")]);

        handler.initialize_profile("jdk.ExecutionSample");
        handler.initialize_pid("jdk.ExecutionSample");
        handler.process_event(&mut buffer, &trace, "jdk.ExecutionSample", 1, 100);
        handler.process_event(&mut buffer, &trace, "jdk.ExecutionSample", 2, 200);
        assert!(handler.pid_types().contains("jdk.ExecutionSample"));

        let trace = handler.into_trace();
        assert_eq!(trace.sample_count(), 2);
        assert_eq!(trace.profiles["jdk.ExecutionSample"][1].thread_id, 2);
        assert_eq!(trace.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_collects_tables_with_header() {
        let mut handler = CollectingHandler::new();
        handler.initialize_event("app.LogContext");
        handler.add_header("app.LogContext", &["msg:text".to_string()]);
        handler.process_context(
            Record::new(vec![Value::Text("hi".to_string())]),
            5,
            "app.LogContext",
        );

        let table = &handler.events()["app.LogContext"];
        assert_eq!(table.header, vec!["msg:text"]);
        assert_eq!(table.records[0].thread_id, 5);
    }

    #[test]
    fn test_table_restores_timestamp_cells_from_header() {
        let json = r#"{
            "header": ["tid:number", "timestamp:timestamp", "elapsed:number"],
            "records": [{"thread_id": 3, "values": [3, 1700000000000, 12]}]
        }"#;

        let table: EventTable = serde_json::from_str(json).unwrap();

        assert_eq!(
            table.records[0].values.values(),
            &[Value::Number(3), Value::Timestamp(1_700_000_000_000), Value::Number(12)]
        );
    }
}
