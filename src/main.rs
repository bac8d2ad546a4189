//! # Gov Notices
//!
//! Collects Korean government support-program announcements from seven
//! public portals, merges them into one deduplicated and deadline-ordered
//! feed, and writes that feed as JSON and as a browser script.
//!
//! ## Usage
//!
//! ```sh
//! gov_notices -o ./public
//! gov_notices -o ./public -c notices.yaml --source gosims --source iris
//! ```
//!
//! ## Architecture
//!
//! 1. **Collection**: each enabled source adapter runs in turn; a failing
//!    source is recorded and skipped
//! 2. **Deduplication**: candidates that describe the same program collapse
//!    to the highest-quality one
//! 3. **Ranking**: upcoming deadlines first, then expired, then undated
//! 4. **Output**: `notices.json` and `notices.js` are replaced wholesale
//!
//! Only a failure to write the output fails the run.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod dedup;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod rank;
mod scrapers;
mod text;
mod utils;

use aggregate::aggregate;
use cli::Cli;
use config::Config;
use fetch::FetchClient;
use outputs::json;
use pipeline::build_payload;
use scrapers::ScrapeContext;
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("gov_notices starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(secs) = args.timeout_secs {
        config.http.timeout_secs = secs;
    }
    if !args.sources.is_empty() {
        config.sources.enabled = args.sources.clone();
    }

    // Fail before any network work if the feed cannot be written.
    let output_dir = Path::new(&args.output_dir);
    if let Err(e) = ensure_writable_dir(output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let client = FetchClient::new(&config.http)?;
    let ctx = ScrapeContext {
        client: &client,
        config: &config.sources,
        today: text::today(),
    };

    let sources = config.sources.run_order();
    info!(sources = ?sources, "Collecting announcements");
    let aggregated = aggregate(&sources, |source| scrapers::collect(source, &ctx)).await;

    let payload = build_payload(aggregated, Local::now());
    json::write_feed(&payload, output_dir, &config.output).await?;

    info!(
        saved = payload.count,
        before_dedupe = payload.before_dedupe_count,
        dedup_removed = payload.dedup_removed,
        no_deadline = payload.no_deadline_count,
        "Feed saved"
    );
    for (source, count) in &payload.source_stats {
        info!(%source, count, "Source breakdown");
    }
    if !payload.errors.is_empty() {
        warn!(
            failed = payload.errors.len(),
            errors = %truncate_for_log(&payload.errors.join(" | "), 500),
            "Some sources failed"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
