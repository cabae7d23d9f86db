//! Normalization driver.
//!
//! One pass over a decoded recording:
//! 1. Classify each event group's type
//! 2. Profile groups: resolve thread, timestamp and stack per sample
//! 3. Custom groups: build the schema on first sight, extract one record
//!    per event
//! 4. Ignored groups: skip without touching the handler
//!
//! All state (schemas, header markers, the sample window) belongs to one
//! `run` call, so concurrent sessions never share anything.

use crate::handler::EventHandler;
use crate::parser::{
    extract_record, Classification, ContentKind, EventCollection, EventGroup, SchemaRegistry,
    StackTrace, TypeClassifier, UNRESOLVED_THREAD_ID,
};
use crate::utils::config::ParserConfig;
use log::debug;
use std::collections::HashSet;

/// Epoch value reported when a sample has no resolvable timestamp
pub const UNRESOLVED_TIMESTAMP: i64 = -1;

/// Time window anchored on the first delivered sample
///
/// Samples later than `anchor + duration` are dropped. Samples without a
/// timestamp are always admitted. A zero duration admits everything.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    duration_ns: u64,
    anchor_ns: Option<i64>,
}

impl SampleWindow {
    pub fn new(duration_ns: u64) -> Self {
        Self {
            duration_ns,
            anchor_ns: None,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Decide whether a sample at `epoch_ns` is delivered
    pub fn admits(&mut self, epoch_ns: Option<i64>) -> bool {
        if self.duration_ns == 0 {
            return true;
        }
        let Some(ts) = epoch_ns else {
            return true;
        };
        let anchor = *self.anchor_ns.get_or_insert(ts);
        let limit = anchor.saturating_add(i64::try_from(self.duration_ns).unwrap_or(i64::MAX));
        ts <= limit
    }
}

/// Counters for one normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub profile_samples: usize,
    pub dropped_samples: usize,
    pub custom_records: usize,
    pub ignored_groups: usize,
}

/// Drives classification, schema inference and extraction
#[derive(Debug, Clone)]
pub struct Normalizer {
    classifier: TypeClassifier,
    duration_ns: u64,
}

impl Normalizer {
    pub fn new(classifier: TypeClassifier, duration_ns: u64) -> Self {
        Self {
            classifier,
            duration_ns,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(TypeClassifier::from_config(config), config.duration)
    }

    pub fn classifier(&self) -> &TypeClassifier {
        &self.classifier
    }

    /// Normalize `events` into `handler`
    ///
    /// **Public** - main entry point, one call per parse session
    ///
    /// Order across types follows the collection's group order; order
    /// within a type follows instance order.
    pub fn run<H: EventHandler + ?Sized>(&self, events: &EventCollection, handler: &mut H) -> SessionStats {
        let mut session = Session::new(self.duration_ns);

        for group in events {
            match self.classifier.classify(group.identifier()) {
                Classification::Profile => session.process_profile(group, handler),
                Classification::Custom => session.process_custom(group, handler),
                Classification::Ignore => {
                    debug!("Ignoring event type {}", group.identifier());
                    session.stats.ignored_groups += 1;
                }
            }
        }

        debug!("Normalization finished: {:?}", session.stats);
        session.stats
    }
}

/// Normalize with a one-off normalizer built from `config`
pub fn process_events<H: EventHandler + ?Sized>(
    config: &ParserConfig,
    events: &EventCollection,
    handler: &mut H,
) -> SessionStats {
    Normalizer::from_config(config).run(events, handler)
}

/// Job-local state of one pass
struct Session {
    schemas: SchemaRegistry,
    profiles_seen: HashSet<String>,
    window: SampleWindow,
    buffer: String,
    empty_stack: StackTrace,
    stats: SessionStats,
}

impl Session {
    fn new(duration_ns: u64) -> Self {
        Self {
            schemas: SchemaRegistry::new(),
            profiles_seen: HashSet::new(),
            window: SampleWindow::new(duration_ns),
            buffer: String::new(),
            empty_stack: StackTrace::default(),
            stats: SessionStats::default(),
        }
    }

    fn process_profile<H: EventHandler + ?Sized>(&mut self, group: &EventGroup, handler: &mut H) {
        let type_id = group.identifier();
        let event_type = &group.event_type;

        if self.profiles_seen.insert(type_id.to_string()) {
            handler.initialize_profile(type_id);
            handler.initialize_pid(type_id);
        }

        let stack_attr = event_type.stack_trace_attribute();
        let thread_attr = event_type.first_of_kind(ContentKind::Thread);
        let timestamp_attr = event_type.first_of_kind(ContentKind::Timestamp);

        debug!("Processing {} samples of {}", group.events.len(), type_id);

        for event in group {
            let thread_id = thread_attr
                .and_then(|a| event.thread(a))
                .map_or(UNRESOLVED_THREAD_ID, |t| t.id);

            let timestamp = timestamp_attr.and_then(|a| event.quantity(a));
            let epoch_ns = timestamp.and_then(|q| q.unit.to_epoch_nanos(q.long_value()));
            if !self.window.admits(epoch_ns) {
                self.stats.dropped_samples += 1;
                continue;
            }
            let epoch = timestamp.map_or(UNRESOLVED_TIMESTAMP, |q| q.long_value());

            let stack_trace = stack_attr
                .and_then(|a| event.stack_trace(a))
                .unwrap_or(&self.empty_stack);

            handler.process_event(&mut self.buffer, stack_trace, type_id, thread_id, epoch);
            self.stats.profile_samples += 1;
        }
    }

    fn process_custom<H: EventHandler + ?Sized>(&mut self, group: &EventGroup, handler: &mut H) {
        let type_id = group.identifier();

        let (_, newly_built) = self.schemas.get_or_build(type_id, &group.event_type.attributes);
        if !newly_built {
            debug!("Reusing schema for {}", type_id);
        }

        // Header goes out right before the first record of the type
        if !group.events.is_empty() {
            if let Some(header) = self.schemas.take_pending_header(type_id) {
                handler.initialize_event(type_id);
                handler.add_header(type_id, &header);
            }
        }

        let Some(schema) = self.schemas.get(type_id) else {
            return;
        };

        for event in group {
            let extracted = extract_record(event, schema.attributes());
            handler.process_context(extracted.record, extracted.thread_id, type_id);
            self.stats.custom_records += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_anchors_on_first_sample() {
        let mut window = SampleWindow::new(1_000);
        assert!(window.admits(Some(5_000)));
        assert!(window.admits(Some(6_000)));
        assert!(!window.admits(Some(6_001)));
        // Earlier samples stay inside the window
        assert!(window.admits(Some(4_000)));
    }

    #[test]
    fn test_window_admits_unresolved_and_unbounded() {
        let mut window = SampleWindow::new(10);
        assert!(window.admits(None));
        assert!(window.admits(Some(0)));
        assert!(window.admits(None));

        let mut unbounded = SampleWindow::unbounded();
        assert!(unbounded.admits(Some(0)));
        assert!(unbounded.admits(Some(i64::MAX)));
    }

    #[test]
    fn test_ignored_groups_counted() {
        use crate::handler::CollectingHandler;
        use crate::parser::{EventGroup, EventType};

        let events = EventCollection::new(vec![EventGroup::new(
            EventType::new("jdk.GCPhasePause", vec![]),
            vec![],
        )]);
        let mut handler = CollectingHandler::new();

        let stats = process_events(&ParserConfig::default(), &events, &mut handler);
        assert_eq!(stats.ignored_groups, 1);
        assert!(handler.profiles().is_empty());
        assert!(handler.events().is_empty());
    }
}
