//! Field extraction for custom structured events.
//!
//! Walks a schema's attributes in order and produces one value per column.
//! Timespans are scaled against the unit of the timestamp that precedes
//! them in the same record; when no timestamp precedes a timespan the
//! reference is nanoseconds. Missing or unconvertible values become
//! `Value::Null` so the column count never changes.

use super::event::{Attribute, ContentKind, Quantity, TraceEvent};
use super::units::Unit;
use crate::utils::config::NANOS_PER_MILLI;
use crate::utils::error::UnitError;
use log::warn;
use serde::{Deserialize, Serialize};

/// Thread id reported when an event has no resolvable thread
pub const UNRESOLVED_THREAD_ID: i64 = -1;

/// One typed cell of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    /// Epoch milliseconds
    Timestamp(i64),
    Text(String),
    Null,
}

/// Ordered values matching one type's column schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<Value>);

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    fn push(&mut self, value: Value) {
        self.0.push(value);
    }
}

/// Extraction result: the record plus the thread it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub record: Record,
    pub thread_id: i64,
}

/// Extract one record from `event`
///
/// **Public** - used by the normalization driver for custom events
///
/// # Arguments
/// * `event` - Event instance
/// * `attributes` - Attributes in column order (from `ColumnSchema::attributes`)
pub fn extract_record(event: &TraceEvent, attributes: &[Attribute]) -> Extracted {
    let mut record = Record::default();
    let mut thread_id = UNRESOLVED_THREAD_ID;
    let mut reference_unit: Option<Unit> = None;

    for attribute in attributes {
        match attribute.kind {
            ContentKind::Thread => match event.thread(attribute) {
                Some(thread) => {
                    thread_id = thread.id;
                    record.push(Value::Number(thread.id));
                    record.push(Value::Text(thread.name.clone()));
                }
                None => {
                    record.push(Value::Null);
                    record.push(Value::Null);
                }
            },
            ContentKind::Timestamp => match event.quantity(attribute) {
                Some(q) => {
                    reference_unit = Some(q.unit);
                    record.push(Value::Timestamp(epoch_millis(q)));
                }
                None => record.push(Value::Null),
            },
            ContentKind::Timespan => {
                let value = event.quantity(attribute).and_then(|q| {
                    let reference = reference_unit.unwrap_or(Unit::EpochNanos);
                    match convert_timespan(q, reference) {
                        Ok(ms) => Some(Value::Number(ms)),
                        Err(e) => {
                            warn!("Skipping timespan '{}': {}", attribute.identifier, e);
                            None
                        }
                    }
                });
                record.push(value.unwrap_or(Value::Null));
            }
            ContentKind::Text => {
                let value = event.text(attribute).map(|s| Value::Text(s.to_string()));
                record.push(value.unwrap_or(Value::Null));
            }
            ContentKind::Number => {
                let value = event.quantity(attribute).map(|q| Value::Number(q.long_value()));
                record.push(value.unwrap_or(Value::Null));
            }
            ContentKind::StackTrace | ContentKind::Other => {}
        }
    }

    Extracted { record, thread_id }
}

/// Raw timestamp value divided by 1e6 and rounded
pub fn epoch_millis(timestamp: &Quantity) -> i64 {
    (timestamp.long_value() as f64 / NANOS_PER_MILLI).round() as i64
}

/// Convert a timespan to milliseconds relative to a timestamp unit
///
/// `round(multiplier(timespan.unit -> reference.delta_unit) * raw / 1e6)`
///
/// # Errors
/// * `UnitError::Incommensurable` - timespan unit is not a time unit
pub fn convert_timespan(timespan: &Quantity, reference: Unit) -> Result<i64, UnitError> {
    let ratio = timespan.unit.transform_multiplier_to(reference.delta_unit())?;
    Ok((ratio * timespan.long_value() as f64 / NANOS_PER_MILLI).round() as i64)
}
