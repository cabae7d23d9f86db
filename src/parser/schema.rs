//! Column schemas for custom structured events.
//!
//! The set of attributes per event type is only known at runtime, so a
//! type's column layout is derived from the first definition seen in a parse
//! session and frozen. Later groups of the same type reuse it unchanged,
//! which keeps every record of a type aligned with its header.

use super::event::{Attribute, ContentKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Column value tag written into header names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticTag {
    Text,
    Number,
    Timestamp,
}

impl fmt::Display for SemanticTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SemanticTag::Text => "text",
            SemanticTag::Number => "number",
            SemanticTag::Timestamp => "timestamp",
        };
        f.write_str(tag)
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub tag: SemanticTag,
}

impl Column {
    pub fn new(name: impl Into<String>, tag: SemanticTag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    /// Header form, e.g. `tid:number`
    pub fn header(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

/// Ordered columns of one event type plus the attributes feeding them
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
    attributes: Vec<Attribute>,
}

impl ColumnSchema {
    /// Derive columns from attribute definitions in iteration order
    ///
    /// Thread attributes contribute `tid:number` and `threadname:text`;
    /// timestamps contribute `timestamp:timestamp`; timespans contribute
    /// `<identifier>:number`; text and number attributes contribute
    /// `<identifier>:<kind>`. Other kinds contribute nothing.
    pub fn build(attributes: &[Attribute]) -> Self {
        let mut columns = Vec::new();
        let mut used = Vec::new();

        for attribute in attributes {
            match attribute.kind {
                ContentKind::Thread => {
                    columns.push(Column::new("tid", SemanticTag::Number));
                    columns.push(Column::new("threadname", SemanticTag::Text));
                }
                ContentKind::Timestamp => {
                    columns.push(Column::new("timestamp", SemanticTag::Timestamp));
                }
                ContentKind::Timespan => {
                    columns.push(Column::new(&attribute.identifier, SemanticTag::Number));
                }
                ContentKind::Text => {
                    columns.push(Column::new(&attribute.identifier, SemanticTag::Text));
                }
                ContentKind::Number => {
                    columns.push(Column::new(&attribute.identifier, SemanticTag::Number));
                }
                ContentKind::StackTrace | ContentKind::Other => continue,
            }
            used.push(attribute.clone());
        }

        Self {
            columns,
            attributes: used,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Attributes that produce columns, in column order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Header names in column order
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(Column::header).collect()
    }
}

/// Per-session schema cache with a header-emitted marker per type
///
/// One registry lives for exactly one parse session and is never shared
/// between jobs.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ColumnSchema>,
    emitted: HashSet<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the schema for `type_id`, building it on first sight
    ///
    /// The flag is `true` only for the call that built the schema.
    pub fn get_or_build(&mut self, type_id: &str, attributes: &[Attribute]) -> (&ColumnSchema, bool) {
        let newly_built = !self.schemas.contains_key(type_id);
        if newly_built {
            let schema = ColumnSchema::build(attributes);
            debug!("Built schema for {} with {} columns", type_id, schema.len());
            self.schemas.insert(type_id.to_string(), schema);
        }
        // Present: inserted above or cached
        let schema = &self.schemas[type_id];
        (schema, newly_built)
    }

    pub fn get(&self, type_id: &str) -> Option<&ColumnSchema> {
        self.schemas.get(type_id)
    }

    /// Mark the header of `type_id` as delivered
    ///
    /// Returns `true` the first time only.
    pub fn mark_header_emitted(&mut self, type_id: &str) -> bool {
        self.emitted.insert(type_id.to_string())
    }

    /// Header of `type_id` if it was built but not delivered yet
    ///
    /// Marks the header as delivered, so it is returned at most once.
    pub fn take_pending_header(&mut self, type_id: &str) -> Option<Vec<String>> {
        let header = self.schemas.get(type_id)?.header();
        self.mark_header_emitted(type_id).then_some(header)
    }

    pub fn header_emitted(&self, type_id: &str) -> bool {
        self.emitted.contains(type_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::units::Unit;

    fn log_context_attributes() -> Vec<Attribute> {
        vec![
            Attribute::new("startTime", ContentKind::Timestamp),
            Attribute::new("duration", ContentKind::Timespan).with_unit(Unit::Milliseconds),
            Attribute::new("eventThread", ContentKind::Thread),
            Attribute::new("stackTrace", ContentKind::StackTrace),
            Attribute::new("message", ContentKind::Text),
            Attribute::new("size", ContentKind::Number),
        ]
    }

    #[test]
    fn test_build_column_order() {
        let schema = ColumnSchema::build(&log_context_attributes());
        assert_eq!(
            schema.header(),
            vec![
                "timestamp:timestamp",
                "duration:number",
                "tid:number",
                "threadname:text",
                "message:text",
                "size:number",
            ]
        );
        // Stack trace contributes no column
        assert_eq!(schema.attributes().len(), 5);
    }

    #[test]
    fn test_registry_builds_once() {
        let mut registry = SchemaRegistry::new();
        let attributes = log_context_attributes();

        let (first, built) = registry.get_or_build("app.LogContext", &attributes);
        let first_len = first.len();
        assert!(built);

        // A later definition with fewer attributes does not change the schema
        let (second, built) = registry.get_or_build("app.LogContext", &attributes[..1]);
        assert!(!built);
        assert_eq!(second.len(), first_len);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_header_marker_is_monotonic() {
        let mut registry = SchemaRegistry::new();
        assert!(!registry.header_emitted("a"));
        assert!(registry.mark_header_emitted("a"));
        assert!(!registry.mark_header_emitted("a"));
        assert!(registry.header_emitted("a"));
    }

    #[test]
    fn test_pending_header_taken_once() {
        let mut registry = SchemaRegistry::new();
        assert_eq!(registry.take_pending_header("app.MqFrm"), None);

        registry.get_or_build("app.MqFrm", &[Attribute::new("queue", ContentKind::Text)]);
        assert_eq!(
            registry.take_pending_header("app.MqFrm"),
            Some(vec!["queue:text".to_string()])
        );
        assert_eq!(registry.take_pending_header("app.MqFrm"), None);
    }

    #[test]
    fn test_other_kinds_have_no_columns() {
        let schema = ColumnSchema::build(&[Attribute::new("address", ContentKind::Other)]);
        assert!(schema.is_empty());
    }
}
