//! Classify command: show how each event type in a recording is routed.

use super::parse::load_config;
use crate::parser::{Classification, JsonTraceLoader, TraceLoader, TypeClassifier};
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

/// Event type with its routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRoute {
    pub identifier: String,
    pub classification: Classification,
    pub event_count: usize,
}

/// Classify every event type present in a recording
///
/// **Public** - used by the `classify` subcommand and tests
pub fn classify_recording(input: &Path, classifier: &TypeClassifier) -> Result<Vec<TypeRoute>> {
    let events = JsonTraceLoader::new()
        .load_path(input)
        .with_context(|| format!("Failed to load recording {}", input.display()))?;

    Ok(events
        .iter()
        .map(|group| TypeRoute {
            identifier: group.identifier().to_string(),
            classification: classifier.classify(group.identifier()),
            event_count: group.events.len(),
        })
        .collect())
}

/// Execute the classify command and print a table
pub fn execute_classify(input: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let classifier = TypeClassifier::from_config(&config);

    let routes = classify_recording(&input, &classifier)?;
    info!("Classified {} event types", routes.len());

    println!("  {:<50} {:<10} {:>10}", "EVENT TYPE", "ROUTE", "EVENTS");
    println!("  {}", "-".repeat(72));
    for route in &routes {
        println!(
            "  {:<50} {:<10} {:>10}",
            route.identifier, route.classification, route.event_count
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::ParserConfig;

    #[test]
    fn test_classify_recording() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("recording.json");
        std::fs::write(
            &input,
            r#"[
                {"identifier": "jdk.ExecutionSample", "events": [{}, {}]},
                {"identifier": "app.MqFrmPublish", "events": [{}]},
                {"identifier": "jdk.GCPhasePause"}
            ]"#,
        )
        .unwrap();

        let classifier = TypeClassifier::from_config(&ParserConfig::default());
        let routes = classify_recording(&input, &classifier).unwrap();

        let summary: Vec<_> = routes
            .iter()
            .map(|r| (r.identifier.as_str(), r.classification, r.event_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("jdk.ExecutionSample", Classification::Profile, 2),
                ("app.MqFrmPublish", Classification::Custom, 1),
                ("jdk.GCPhasePause", Classification::Ignore, 0),
            ]
        );
    }

    #[test]
    fn test_classify_missing_file() {
        let classifier = TypeClassifier::default();
        assert!(classify_recording(Path::new("/nonexistent/recording.json"), &classifier).is_err());
    }
}
