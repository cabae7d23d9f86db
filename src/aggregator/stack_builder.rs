//! Build collapsed stack format from stack samples.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "root;child;leaf weight"
//!
//! Example: "Thread.run;Worker.loop;Socket.read 12"
//! This means: 12 samples landed in Socket.read called from that path.

use crate::handler::StackSample;
use log::debug;
use std::collections::HashMap;

/// Label for stacks folded together by `merge_small_stacks`
pub const OTHER_STACK: &str = "other";

/// Label for samples carrying no frames
pub const EMPTY_STACK: &str = "[no stack]";

/// A single collapsed stack entry
///
/// **Public** - used by flamegraph generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string, root first
    pub stack: String,

    /// Weight (number of samples on this stack)
    pub weight: u64,
}

impl CollapsedStack {
    /// Create a new collapsed stack
    ///
    /// **Public** - constructor
    pub fn new(stack: impl Into<String>, weight: u64) -> Self {
        Self {
            stack: stack.into(),
            weight,
        }
    }

    /// Line in collapsed format
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from samples
///
/// **Public** - main entry point for stack building
///
/// # Arguments
/// * `samples` - Stack samples delivered by the normalizer
///
/// # Returns
/// One entry per unique stack, sorted by weight (descending), ties by name
pub fn build_collapsed_stacks<'a, I>(samples: I) -> Vec<CollapsedStack>
where
    I: IntoIterator<Item = &'a StackSample>,
{
    let mut stack_map: HashMap<String, u64> = HashMap::new();
    let mut sample_count = 0usize;

    for sample in samples {
        let collapsed = sample.stack_trace.collapsed();
        let key = if collapsed.is_empty() {
            EMPTY_STACK.to_string()
        } else {
            collapsed
        };
        *stack_map.entry(key).or_insert(0) += 1;
        sample_count += 1;
    }

    debug!(
        "Collapsed {} samples into {} unique stacks",
        sample_count,
        stack_map.len()
    );

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();

    sort_stacks(&mut stacks);
    stacks
}

/// Fold stacks holding less than `threshold` of all samples into "other"
///
/// **Public** - keeps sparse stacks from cluttering the flamegraph
///
/// A threshold of 0 (or less) returns the stacks unchanged.
pub fn merge_small_stacks(stacks: Vec<CollapsedStack>, threshold: f64) -> Vec<CollapsedStack> {
    if threshold <= 0.0 {
        return stacks;
    }

    let total: u64 = stacks.iter().map(|s| s.weight).sum();
    if total == 0 {
        return stacks;
    }

    let mut merged = Vec::with_capacity(stacks.len());
    let mut other_weight = 0u64;

    for stack in stacks {
        if (stack.weight as f64 / total as f64) < threshold {
            other_weight += stack.weight;
        } else {
            merged.push(stack);
        }
    }

    if other_weight > 0 {
        debug!("Merged {} samples into '{}'", other_weight, OTHER_STACK);
        merged.push(CollapsedStack::new(OTHER_STACK, other_weight));
        sort_stacks(&mut merged);
    }

    merged
}

fn sort_stacks(stacks: &mut [CollapsedStack]) {
    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Frame, StackTrace};

    fn sample(frames: &[&str]) -> StackSample {
        StackSample {
            thread_id: 1,
            epoch_timestamp: 0,
            stack_trace: StackTrace::new(frames.iter().map(|f| Frame::new(*f)).collect()),
            event_type: "jdk.ExecutionSample".to_string(),
        }
    }

    #[test]
    fn test_collapsed_stack_to_line() {
        let stack = CollapsedStack::new("main;execute;read", 1000);
        assert_eq!(stack.to_line(), "main;execute;read 1000");
    }

    #[test]
    fn test_build_counts_identical_stacks() {
        let samples = vec![
            sample(&["read", "main"]),
            sample(&["read", "main"]),
            sample(&["write", "main"]),
            sample(&[]),
        ];

        let stacks = build_collapsed_stacks(&samples);

        assert_eq!(stacks[0], CollapsedStack::new("main;read", 2));
        assert_eq!(stacks.len(), 3);
        assert!(stacks.iter().any(|s| s.stack == EMPTY_STACK));
    }

    #[test]
    fn test_merge_small_stacks() {
        let stacks = vec![
            CollapsedStack::new("big_stack", 1000),
            CollapsedStack::new("small_stack_1", 10),
            CollapsedStack::new("small_stack_2", 15),
            CollapsedStack::new("medium_stack", 500),
        ];

        let merged = merge_small_stacks(stacks, 0.05);

        // Should have: big_stack (1000), medium_stack (500), other (25)
        assert_eq!(merged.len(), 3);
        let other = merged.iter().find(|s| s.stack == OTHER_STACK).unwrap();
        assert_eq!(other.weight, 25);
    }

    #[test]
    fn test_merge_disabled_with_zero_threshold() {
        let stacks = vec![CollapsedStack::new("a", 1), CollapsedStack::new("b", 1000)];
        assert_eq!(merge_small_stacks(stacks.clone(), 0.0), stacks);
    }
}
