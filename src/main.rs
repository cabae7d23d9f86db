//! JFR Normalizer CLI
//!
//! Normalizes JSON-dumped flight recordings into stack samples and
//! custom event tables, with optional flamegraphs of the samples.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use jfr_normalizer::commands::{execute_classify, execute_parse, validate_args, ParseArgs};
use jfr_normalizer::flamegraph::FlamegraphConfig;
use jfr_normalizer::utils::config::SCHEMA_VERSION;

/// JFR Normalizer - stack samples and event tables from flight recordings
#[derive(Parser, Debug)]
#[command(name = "jfr-normalize")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize a recording
    Parse {
        /// Recording dumped to JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for normalized JSON
        #[arg(short, long, default_value = "normalized.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Parser configuration JSON
        #[arg(short, long, env = "JFR_NORMALIZER_CONFIG")]
        config: Option<PathBuf>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Show how each event type in a recording is routed
    Classify {
        /// Recording dumped to JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Parser configuration JSON
        #[arg(short, long, env = "JFR_NORMALIZER_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Parse {
            input,
            output,
            flamegraph,
            config,
            title,
            width,
            summary,
        } => {
            let fg_config = flamegraph.as_ref().map(|_| {
                let fg = FlamegraphConfig::new().with_width(width);
                match title {
                    Some(title) => fg.with_title(title),
                    None => fg,
                }
            });

            let args = ParseArgs {
                input,
                output_json: output,
                output_svg: flamegraph,
                config_path: config,
                flamegraph_config: fg_config,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_parse(args)?;
        }

        Commands::Classify { input, config } => {
            execute_classify(input, config)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Display version information
///
/// **Private** - internal command implementation
fn display_version() {
    println!("JFR Normalizer v{}", env!("CARGO_PKG_VERSION"));
    println!("Output Schema: v{}", SCHEMA_VERSION);
}
