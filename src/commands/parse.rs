//! Parse command implementation.
//!
//! The parse command:
//! 1. Loads parser configuration
//! 2. Normalizes the recording through the parse gateway
//! 3. Writes the normalized JSON output
//! 4. Builds collapsed stacks from profile samples
//! 5. Generates flamegraph (if requested)

use crate::aggregator::{build_collapsed_stacks, merge_small_stacks};
use crate::flamegraph::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
use crate::gateway::JfrParser;
use crate::handler::CollectingHandler;
use crate::output::{validate_output_path, write_output, write_svg};
use crate::utils::config::ParserConfig;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the parse command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ParseArgs {
    /// Recording to normalize
    pub input: PathBuf,

    /// Output path for normalized JSON
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Parser configuration file (defaults apply when absent)
    pub config_path: Option<PathBuf>,

    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for ParseArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_json: PathBuf::from("normalized.json"),
            output_svg: None,
            config_path: None,
            flamegraph_config: None,
            print_summary: false,
        }
    }
}

/// Execute the parse command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Configuration file unreadable or invalid
/// * Recording unreadable, undecodable, or parser busy
/// * File write errors
pub fn execute_parse(args: ParseArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Starting parse of recording: {}", args.input.display());

    // Step 1: Configuration
    info!("Step 1/5: Loading parser configuration...");
    let config = load_config(args.config_path.as_ref())?;

    // Step 2: Normalize
    info!("Step 2/5: Normalizing recording...");
    let parser = JfrParser::new(config.clone()).context("Failed to create parser")?;
    let handler = parser
        .parse_path(CollectingHandler::new(), &args.input)
        .with_context(|| format!("Failed to parse recording {}", args.input.display()))?;
    let trace = handler.into_trace();

    debug!(
        "Normalized {} samples across {} profile types, {} records across {} event types",
        trace.sample_count(),
        trace.profiles.len(),
        trace.record_count(),
        trace.events.len()
    );

    // Step 3: Write JSON
    info!("Step 3/5: Writing normalized output...");
    write_output(&trace, &args.output_json).context("Failed to write normalized JSON")?;
    info!("✓ Normalized trace written to: {}", args.output_json.display());

    // Step 4: Collapsed stacks
    info!("Step 4/5: Building collapsed stacks...");
    let stacks = merge_small_stacks(build_collapsed_stacks(trace.samples()), config.threshold);
    debug!("Built {} stacks after merging below {}", stacks.len(), config.threshold);

    // Step 5: Flamegraph
    match &args.output_svg {
        Some(svg_path) if stacks.is_empty() => {
            info!(
                "Step 5/5: No profile samples, skipping flamegraph {}",
                svg_path.display()
            );
        }
        Some(svg_path) => {
            info!("Step 5/5: Generating flamegraph...");
            let svg = generate_flamegraph(&stacks, args.flamegraph_config.as_ref())
                .context("Failed to generate flamegraph")?;
            write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
            info!("✓ Flamegraph written to: {}", svg_path.display());
        }
        None => info!("Step 5/5: Skipping flamegraph generation (not requested)"),
    }

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("NORMALIZATION SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Recording:      {}", args.input.display());
        println!("Profile types:  {}", trace.profiles.len());
        println!("Samples:        {}", trace.sample_count());
        println!("Event types:    {}", trace.events.len());
        println!("Records:        {}", trace.record_count());
        if !stacks.is_empty() {
            println!("\n{}", generate_text_summary(&stacks, 10));
        }
        println!("{}", "=".repeat(80));
    }

    info!("Parse completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Configuration from file, or defaults
///
/// **Public** - shared with the classify command
pub fn load_config(path: Option<&PathBuf>) -> Result<ParserConfig> {
    let config = match path {
        Some(path) => ParserConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ParserConfig::default(),
    };
    config.validate().context("Invalid parser configuration")?;
    Ok(config)
}

/// Validate parse arguments
///
/// **Public** - can be called before execute_parse for early validation
pub fn validate_args(args: &ParseArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input recording path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input recording not found: {}", args.input.display());
    }

    validate_output_path(&args.output_json).context("Invalid JSON output path")?;

    if let Some(svg_path) = &args.output_svg {
        validate_output_path(svg_path).context("Invalid flamegraph output path")?;
    }

    if let Some(fg) = &args.flamegraph_config {
        if fg.width < 100 {
            anyhow::bail!("Flamegraph width is too small (min 100)");
        }
    }

    Ok(())
}
