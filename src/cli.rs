//! Command-line interface definitions for the announcement feed builder.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options can also be provided via environment variables; values given here
//! override the configuration file.

use crate::models::Source;
use clap::Parser;

/// Command-line arguments for a single feed build.
///
/// # Examples
///
/// ```sh
/// # Write notices.json and notices.js into ./public
/// gov_notices -o ./public
///
/// # Use a configuration file and only two sources
/// gov_notices -o ./public -c notices.yaml -s gosims -s kstartup
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory the feed files are written to
    #[arg(short, long, env = "NOTICES_OUTPUT_DIR", default_value = ".")]
    pub output_dir: String,

    /// Optional path to a YAML configuration file
    #[arg(short, long, env = "NOTICES_CONFIG")]
    pub config: Option<String>,

    /// Per-request timeout in seconds (overrides the configuration file)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Only run these sources (repeatable; overrides the configuration file)
    #[arg(short, long = "source", value_enum)]
    pub sources: Vec<Source>,
}
