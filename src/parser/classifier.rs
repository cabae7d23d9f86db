//! Event type classification by substring matchers.
//!
//! Profile matchers are checked before custom event matchers, so a type
//! matching both is a profile. Matching is case-sensitive containment:
//! `"Socket"` matches `jdk.SocketRead` and `jdk.SocketWrite` alike.

use crate::utils::config::ParserConfig;
use serde::Serialize;
use std::fmt;

/// How the normalizer treats an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Stack-sampling event, delivered as stack samples
    Profile,
    /// Structured application event, delivered as tabular records
    Custom,
    /// Not selected by any matcher
    Ignore,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Profile => "profile",
            Classification::Custom => "custom",
            Classification::Ignore => "ignore",
        };
        f.pad(label)
    }
}

/// Classifier over the configured matcher lists
#[derive(Debug, Clone, Default)]
pub struct TypeClassifier {
    profile_matchers: Vec<String>,
    custom_event_matchers: Vec<String>,
}

impl TypeClassifier {
    pub fn new(profile_matchers: Vec<String>, custom_event_matchers: Vec<String>) -> Self {
        Self {
            profile_matchers,
            custom_event_matchers,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.profiles.clone(), config.custom_events.clone())
    }

    /// Classify an event type identifier
    ///
    /// **Public** - pure function of the matcher lists
    pub fn classify(&self, type_identifier: &str) -> Classification {
        if self.is_profile(type_identifier) {
            Classification::Profile
        } else if self.is_custom_event(type_identifier) {
            Classification::Custom
        } else {
            Classification::Ignore
        }
    }

    pub fn is_profile(&self, type_identifier: &str) -> bool {
        contains_any(type_identifier, &self.profile_matchers)
    }

    pub fn is_custom_event(&self, type_identifier: &str) -> bool {
        contains_any(type_identifier, &self.custom_event_matchers)
    }
}

fn contains_any(type_identifier: &str, matchers: &[String]) -> bool {
    matchers.iter().any(|m| type_identifier.contains(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_classifier() -> TypeClassifier {
        TypeClassifier::from_config(&ParserConfig::default())
    }

    #[test]
    fn test_default_profiles() {
        let classifier = default_classifier();
        assert_eq!(classifier.classify("jdk.ExecutionSample"), Classification::Profile);
        assert_eq!(classifier.classify("jdk.SocketRead"), Classification::Profile);
    }

    #[test]
    fn test_default_custom_events() {
        let classifier = default_classifier();
        assert_eq!(classifier.classify("app.LogContext"), Classification::Custom);
        assert_eq!(classifier.classify("com.acme.CPUEvent"), Classification::Custom);
    }

    #[test]
    fn test_unmatched_is_ignored() {
        let classifier = default_classifier();
        assert_eq!(classifier.classify("jdk.GarbageCollection"), Classification::Ignore);
        // Case-sensitive
        assert_eq!(classifier.classify("jdk.socketread"), Classification::Ignore);
    }

    #[test]
    fn test_profile_wins_over_custom() {
        let classifier = TypeClassifier::new(vec!["Sample".into()], vec!["Sample".into()]);
        assert_eq!(classifier.classify("x.Sample"), Classification::Profile);
    }

    #[test]
    fn test_empty_matchers_ignore_everything() {
        let classifier = TypeClassifier::default();
        assert_eq!(classifier.classify("jdk.ExecutionSample"), Classification::Ignore);
    }
}
