//! Source adapters for the seven announcement portals.
//!
//! Each adapter follows the same two-phase pattern:
//!
//! 1. **Fetching**: `collect(ctx)` downloads the list page(s) or AJAX pages
//! 2. **Parsing**: pure `parse*` functions turn raw text into [`Notice`]s
//!
//! Parsing functions take `today` explicitly so D-day values are
//! deterministic under test.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Cap |
//! |--------|--------|--------|-----|
//! | K-Startup | [`kstartup`] | HTML pattern scan | 80 |
//! | Bizinfo | [`bizinfo`] | HTML table (`scraper`) | 140 |
//! | IRIS | [`iris`] | HTML pattern scan | 120 |
//! | egbiz | [`egbiz`] | AJAX JSON, 12 month POSTs | 180 |
//! | SMTECH | [`smtech`] | HTML pattern scan | 120 |
//! | SMES24 | [`smes24`] | HTML table + popup link script | 200 |
//! | Subsidy portal | [`gosims`] | AJAX JSON, paged POSTs | 240 |
//!
//! # Common Patterns
//!
//! - A local `seen` set (or id-keyed map) removes repeats within one source
//! - Rows without a title are dropped, never forwarded
//! - Output is truncated to a fixed cap to bound the feed size
//! - Any error aborts only the adapter that raised it; see [`crate::aggregate`]

pub mod bizinfo;
pub mod egbiz;
pub mod gosims;
pub mod iris;
pub mod kstartup;
pub mod smes24;
pub mod smtech;

use crate::config::SourcesConfig;
use crate::fetch::FetchClient;
use crate::models::{Notice, Source};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::error::Error;
use tracing::debug;

/// Everything an adapter needs for one run.
#[derive(Debug)]
pub struct ScrapeContext<'a> {
    pub client: &'a FetchClient,
    pub config: &'a SourcesConfig,
    pub today: NaiveDate,
}

/// Run the adapter for `source`.
pub async fn collect(source: Source, ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    match source {
        Source::KStartup => kstartup::collect(ctx).await,
        Source::Bizinfo => bizinfo::collect(ctx).await,
        Source::Iris => iris::collect(ctx).await,
        Source::Egbiz => egbiz::collect(ctx).await,
        Source::Smtech => smtech::collect(ctx).await,
        Source::Smes24 => smes24::collect(ctx).await,
        Source::Gosims => gosims::collect(ctx).await,
    }
}

/// Truncate an adapter's output to its cap.
pub(crate) fn cap(mut notices: Vec<Notice>, limit: usize, source: Source) -> Vec<Notice> {
    if notices.len() > limit {
        debug!(%source, dropped = notices.len() - limit, limit, "Truncating to source cap");
        notices.truncate(limit);
    }
    notices
}

/// First argument that is non-empty after trimming, or an empty string.
pub(crate) fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> &'a str {
    candidates
        .iter()
        .filter_map(|s| *s)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Accept a JSON string, number or null where the portal is inconsistent.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Bool(bool),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        Some(Raw::Bool(b)) => Some(b.to_string()),
        None => None,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }
}
