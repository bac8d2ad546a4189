//! Turns aggregated adapter output into the feed payload.
//!
//! Deduplicate, rank, then count: the per-source breakdown and the
//! no-deadline count describe the final feed, while `beforeDedupeCount`
//! describes everything the adapters returned.

use crate::aggregate::Aggregated;
use crate::dedup::dedupe;
use crate::models::RunPayload;
use crate::rank::rank;
use chrono::{DateTime, Local};
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{info, instrument};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[instrument(level = "info", skip_all)]
pub fn build_payload(aggregated: Aggregated, now: DateTime<Local>) -> RunPayload {
    let Aggregated { notices, errors } = aggregated;
    let before_dedupe_count = notices.len();

    let (mut notices, dedup_removed) = dedupe(notices);
    rank(&mut notices);

    let source_stats: BTreeMap<_, _> = notices.iter().counts_by(|n| n.source).into_iter().collect();
    let no_deadline_count = notices.iter().filter(|n| !n.has_deadline()).count();

    info!(
        count = notices.len(),
        before_dedupe_count,
        dedup_removed,
        no_deadline_count,
        "Built feed payload"
    );

    RunPayload {
        updated_at: now.format(TIMESTAMP_FORMAT).to_string(),
        count: notices.len(),
        before_dedupe_count,
        dedup_removed,
        no_deadline_count,
        source_stats,
        errors: errors.iter().map(ToString::to_string).collect(),
        notices,
    }
}
