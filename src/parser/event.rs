//! In-memory event model delivered by a trace loader.
//!
//! A decoded recording is an `EventCollection`: events grouped by their
//! type, each group carrying the type's ordered attribute definitions and
//! its instances. Attribute order is the iteration order every consumer
//! relies on (schema building, field extraction).

use super::units::Unit;
use crate::utils::config::STACK_TRACE_ATTRIBUTE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Semantic content kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Thread,
    Timestamp,
    Timespan,
    Text,
    Number,
    StackTrace,
    /// Any kind the normalizer does not interpret
    Other,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Thread => "thread",
            ContentKind::Timestamp => "timestamp",
            ContentKind::Timespan => "timespan",
            ContentKind::Text => "text",
            ContentKind::Number => "number",
            ContentKind::StackTrace => "stacktrace",
            ContentKind::Other => "other",
        }
    }
}

impl From<&str> for ContentKind {
    fn from(value: &str) -> Self {
        match value {
            "thread" => ContentKind::Thread,
            "timestamp" => ContentKind::Timestamp,
            "timespan" => ContentKind::Timespan,
            "text" => ContentKind::Text,
            "number" => ContentKind::Number,
            "stacktrace" => ContentKind::StackTrace,
            _ => ContentKind::Other,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ContentKind::from(raw.as_str()))
    }
}

/// Attribute definition of an event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub identifier: String,

    /// Human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub kind: ContentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Attribute {
    pub fn new(identifier: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            kind,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Declared unit, or the default unit for the attribute's kind
    pub fn effective_unit(&self) -> Unit {
        self.unit.unwrap_or(match self.kind {
            ContentKind::Timestamp => Unit::EpochNanos,
            ContentKind::Timespan => Unit::Nanoseconds,
            _ => Unit::Count,
        })
    }
}

/// Event type: identifier plus ordered attribute definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    pub identifier: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl EventType {
    pub fn new(identifier: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            identifier: identifier.into(),
            attributes,
        }
    }

    /// The dedicated stack trace attribute, if this type carries one
    pub fn stack_trace_attribute(&self) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.identifier == STACK_TRACE_ATTRIBUTE)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|a| a.kind == ContentKind::StackTrace)
            })
    }

    /// First attribute of the given kind in iteration order
    pub fn first_of_kind(&self, kind: ContentKind) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.kind == kind)
    }
}

/// Thread identity attached to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl ThreadRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One stack frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub method: String,

    /// Declaring type, if known
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Frame {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            type_name: None,
            line: None,
        }
    }

    /// `Type.method` when the type is known, otherwise just the method
    pub fn display_name(&self) -> String {
        match &self.type_name {
            Some(t) => format!("{}.{}", t, self.method),
            None => self.method.clone(),
        }
    }
}

/// Sampled call stack, leaf frame first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTrace {
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub truncated: bool,
}

impl StackTrace {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            truncated: false,
        }
    }

    /// Root-first, semicolon separated frame names
    pub fn collapsed(&self) -> String {
        self.frames
            .iter()
            .rev()
            .map(Frame::display_name)
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Raw numeric value of a quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
}

/// Number with a unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Numeric,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: i64, unit: Unit) -> Self {
        Self {
            value: Numeric::Integer(value),
            unit,
        }
    }

    pub fn float(value: f64, unit: Unit) -> Self {
        Self {
            value: Numeric::Float(value),
            unit,
        }
    }

    /// Value as a long, floats truncated toward zero
    pub fn long_value(&self) -> i64 {
        match self.value {
            Numeric::Integer(v) => v,
            Numeric::Float(v) => v as i64,
        }
    }
}

/// Value of one attribute on one event
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Thread(ThreadRef),
    Quantity(Quantity),
    Text(String),
    StackTrace(StackTrace),
}

/// One event instance; values keyed by attribute identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceEvent {
    values: HashMap<String, FieldValue>,
}

impl TraceEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, identifier: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(identifier.into(), value);
        self
    }

    pub fn insert(&mut self, identifier: impl Into<String>, value: FieldValue) {
        self.values.insert(identifier.into(), value);
    }

    pub fn value(&self, attribute: &Attribute) -> Option<&FieldValue> {
        self.values.get(&attribute.identifier)
    }

    pub fn thread(&self, attribute: &Attribute) -> Option<&ThreadRef> {
        match self.value(attribute) {
            Some(FieldValue::Thread(t)) => Some(t),
            _ => None,
        }
    }

    pub fn quantity(&self, attribute: &Attribute) -> Option<&Quantity> {
        match self.value(attribute) {
            Some(FieldValue::Quantity(q)) => Some(q),
            _ => None,
        }
    }

    pub fn text(&self, attribute: &Attribute) -> Option<&str> {
        match self.value(attribute) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn stack_trace(&self, attribute: &Attribute) -> Option<&StackTrace> {
        match self.value(attribute) {
            Some(FieldValue::StackTrace(st)) => Some(st),
            _ => None,
        }
    }
}

/// All instances of one event type
#[derive(Debug, Clone, PartialEq)]
pub struct EventGroup {
    pub event_type: EventType,
    pub events: Vec<TraceEvent>,
}

impl EventGroup {
    pub fn new(event_type: EventType, events: Vec<TraceEvent>) -> Self {
        Self { event_type, events }
    }

    pub fn identifier(&self) -> &str {
        &self.event_type.identifier
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEvent> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a EventGroup {
    type Item = &'a TraceEvent;
    type IntoIter = std::slice::Iter<'a, TraceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Decoded recording: event groups in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCollection {
    pub groups: Vec<EventGroup>,
}

impl EventCollection {
    pub fn new(groups: Vec<EventGroup>) -> Self {
        Self { groups }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventGroup> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of event instances across all groups
    pub fn event_count(&self) -> usize {
        self.groups.iter().map(|g| g.events.len()).sum()
    }
}

impl<'a> IntoIterator for &'a EventCollection {
    type Item = &'a EventGroup;
    type IntoIter = std::slice::Iter<'a, EventGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_parsing() {
        assert_eq!(ContentKind::from("timespan"), ContentKind::Timespan);
        assert_eq!(ContentKind::from("address"), ContentKind::Other);
        let kind: ContentKind = serde_json::from_str("\"stacktrace\"").unwrap();
        assert_eq!(kind, ContentKind::StackTrace);
    }

    #[test]
    fn test_effective_unit_defaults() {
        assert_eq!(
            Attribute::new("startTime", ContentKind::Timestamp).effective_unit(),
            Unit::EpochNanos
        );
        assert_eq!(
            Attribute::new("duration", ContentKind::Timespan).effective_unit(),
            Unit::Nanoseconds
        );
        assert_eq!(
            Attribute::new("duration", ContentKind::Timespan)
                .with_unit(Unit::Milliseconds)
                .effective_unit(),
            Unit::Milliseconds
        );
    }

    #[test]
    fn test_collapsed_stack_is_root_first() {
        let trace = StackTrace::new(vec![
            Frame {
                method: "read".to_string(),
                type_name: Some("java.net.Socket".to_string()),
                line: Some(10),
            },
            Frame::new("main"),
        ]);
        assert_eq!(trace.collapsed(), "main;java.net.Socket.read");
    }

    #[test]
    fn test_long_value_truncates() {
        assert_eq!(Quantity::float(12.9, Unit::Count).long_value(), 12);
        assert_eq!(Quantity::float(-12.9, Unit::Count).long_value(), -12);
        assert_eq!(Quantity::new(7, Unit::Bytes).long_value(), 7);
    }

    #[test]
    fn test_typed_accessors() {
        let thread = Attribute::new("eventThread", ContentKind::Thread);
        let message = Attribute::new("message", ContentKind::Text);
        let event = TraceEvent::new()
            .with("eventThread", FieldValue::Thread(ThreadRef::new(3, "worker")))
            .with("message", FieldValue::Text("hello".to_string()));

        assert_eq!(event.thread(&thread).map(|t| t.id), Some(3));
        assert_eq!(event.text(&message), Some("hello"));
        // Wrong kind of value reads as absent
        assert!(event.quantity(&message).is_none());
    }
}
