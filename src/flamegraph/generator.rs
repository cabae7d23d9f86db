//! SVG flamegraph generation for sampled JVM stacks.
//!
//! Renders collapsed stacks as an inverted flamegraph (root at the bottom)
//! with frames colored by package family, plus a plain text summary.

use crate::aggregator::stack_builder::CollapsedStack;
use crate::utils::error::FlamegraphError;
use log::info;
use std::collections::HashMap;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "JFR Stack Samples".to_string(),
            width: 1200,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Internal Node structure for building the tree
struct Node {
    name: String,
    value: u64,
    children: HashMap<String, Node>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            value: 0,
            children: HashMap::new(),
        }
    }

    fn insert(&mut self, stack: &[&str], value: u64) {
        self.value += value;
        if let Some((head, tail)) = stack.split_first() {
            let child = self
                .children
                .entry(head.to_string())
                .or_insert_with(|| Node::new(head.to_string()));
            child.insert(tail, value);
        }
    }
}

/// Generate SVG flamegraph from collapsed stacks
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - nothing to draw
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    // 1. Build Tree
    let mut root = Node::new("all".to_string());
    for stack in stacks {
        let stack_parts: Vec<&str> = stack.stack.split(';').collect();
        root.insert(&stack_parts, stack.weight);
    }

    let max_depth = calculate_max_depth(&root);

    // 2. Render SVG
    let mut svg_content = String::new();
    let width = config.width;
    let height_per_level = 16;
    let graph_height = (max_depth + 1) * height_per_level;
    let legend_height = 60;
    let total_height = graph_height + legend_height;

    svg_content.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        width, total_height, width, total_height
    ));
    svg_content.push_str(
        r#"<style>.frame { font: 11px monospace; } .frame:hover { stroke: black; stroke-width: 1; cursor: pointer; }</style>"#,
    );
    svg_content.push_str(&format!(
        r#"<text x="{}" y="20" font-size="16" text-anchor="middle" font-weight="bold">{}</text>"#,
        width / 2,
        escape_xml(&config.title)
    ));

    render_node(
        &root,
        root.value,
        0,
        0.0,
        width as f64,
        &mut svg_content,
        height_per_level,
        graph_height,
    );

    render_legend(&mut svg_content, graph_height);

    svg_content.push_str("</svg>");

    info!("Flamegraph generated successfully ({} bytes)", svg_content.len());
    Ok(svg_content)
}

fn calculate_max_depth(node: &Node) -> usize {
    node.children
        .values()
        .map(|child| calculate_max_depth(child) + 1)
        .max()
        .unwrap_or(0)
}

fn frame_color(name: &str) -> &'static str {
    if name.starts_with("java.") || name.starts_with("javax.") || name.starts_with("jdk.") {
        "rgb(70, 130, 180)" // Steel Blue (JDK)
    } else if name.starts_with("sun.") || name.starts_with("com.sun.") {
        "rgb(100, 149, 237)" // Cornflower Blue (JDK internals)
    } else if name.contains("::") || name.starts_with('[') {
        "rgb(220, 20, 60)" // Crimson (native / VM)
    } else if name == "all" {
        "rgb(169, 169, 169)" // Gray
    } else if name == crate::aggregator::stack_builder::OTHER_STACK {
        "rgb(211, 211, 211)" // Light Gray
    } else {
        "rgb(255, 140, 0)" // Dark Orange (application)
    }
}

#[allow(clippy::too_many_arguments)]
fn render_node(
    node: &Node,
    total: u64,
    level: usize,
    x: f64,
    w: f64,
    out: &mut String,
    h: usize,
    graph_height: usize,
) {
    if w < 0.5 {
        return;
    } // Don't render invisible blocks

    let y = graph_height - ((level + 1) * h) + 30;
    let percentage = node.value as f64 / total.max(1) as f64 * 100.0;
    let name = escape_xml(&node.name);

    out.push_str(&format!(
        r#"<rect x="{:.2}" y="{}" width="{:.2}" height="{}" fill="{}" class="frame"><title>{} ({} samples, {:.2}%)</title></rect>"#,
        x, y, w, h, frame_color(&node.name), name, node.value, percentage
    ));

    if w > 35.0 {
        let char_width = 7.0;
        let max_chars = (w / char_width) as usize;
        let display_name = truncate_label(&node.name, max_chars);
        if !display_name.is_empty() {
            out.push_str(&format!(
                r#"<text x="{:.2}" y="{}" dx="4" dy="12" font-size="11" fill="white" pointer-events="none">{}</text>"#,
                x,
                y,
                escape_xml(&display_name)
            ));
        }
    }

    let mut current_x = x;
    let mut children: Vec<&Node> = node.children.values().collect();
    children.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));

    for child in children {
        let child_w = (child.value as f64 / node.value as f64) * w;
        render_node(child, total, level + 1, current_x, child_w, out, h, graph_height);
        current_x += child_w;
    }
}

fn render_legend(out: &mut String, graph_height: usize) {
    let legend_y = graph_height + 50;

    out.push_str(&format!(
        r#"<text x="10" y="{}" font-size="14" font-weight="bold">Legend:</text>"#,
        legend_y
    ));

    let items = [
        ("JDK", "rgb(70, 130, 180)"),
        ("JDK internal", "rgb(100, 149, 237)"),
        ("Native/VM", "rgb(220, 20, 60)"),
        ("Application", "rgb(255, 140, 0)"),
    ];

    for (i, (label, color)) in items.iter().enumerate() {
        let x = 80 + (i * 140);
        out.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}" rx="2"/>"#,
            x,
            legend_y - 12,
            color
        ));
        out.push_str(&format!(
            r#"<text x="{}" y="{}" font-size="12">{}</text>"#,
            x + 20,
            legend_y,
            label
        ));
    }
}

fn truncate_label(name: &str, max_chars: usize) -> String {
    let count = name.chars().count();
    if count <= max_chars {
        return name.to_string();
    }
    if max_chars <= 3 {
        return String::new();
    }
    let kept: String = name.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Text table of the hottest stacks
pub fn generate_text_summary(stacks: &[CollapsedStack], max_lines: usize) -> String {
    let total: u64 = stacks.iter().map(|s| s.weight).sum::<u64>().max(1);
    let mut lines = Vec::new();

    lines.push(format!("  {:<60} {:>10} {:>7}", "Hottest stacks (leaf frame)", "SAMPLES", "%"));
    lines.push(format!("  {}", "-".repeat(79)));

    for stack in stacks.iter().take(max_lines) {
        let leaf = stack.stack.rsplit(';').next().unwrap_or(&stack.stack);
        let percentage = stack.weight as f64 / total as f64 * 100.0;
        lines.push(format!(
            "  {:<60} {:>10} {:>6.1}%",
            truncate_label(leaf, 60),
            stack.weight,
            percentage
        ));
    }

    if stacks.len() > max_lines {
        lines.push(String::new());
        lines.push(format!(
            "   (Showing top {} of {} unique stacks)",
            max_lines,
            stacks.len()
        ));
    }

    lines.join("\n")
}
