//! Cross-source deduplication.
//!
//! Portals republish the same announcement with slightly different titles,
//! so records are matched on a normalized title plus their schedule:
//!
//! - primary key: `title | period-or-deadline`, used whenever either is known
//! - secondary key: `title | org | deadline`, for records with neither
//!
//! On a key collision the record with the higher [`QualityScore`] survives
//! and the collision is counted as one removal, whichever side wins. The
//! survivor keeps no trace of the records it replaced.

use crate::models::Notice;
use crate::text::normalize_title;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const SEP: char = '|';

/// How complete and trustworthy a record is, compared field by field.
///
/// Field order is the comparison precedence. The trailing title and id
/// fields only decide between records that tie on everything else, which
/// keeps the surviving set independent of input order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct QualityScore<'a> {
    has_deadline: bool,
    has_period: bool,
    has_org: bool,
    source_priority: u8,
    title_len: usize,
    title: &'a str,
    id: &'a str,
}

impl<'a> QualityScore<'a> {
    pub fn of(notice: &'a Notice) -> Self {
        QualityScore {
            has_deadline: notice.has_deadline(),
            has_period: notice.period_text().is_some(),
            has_org: notice.org_text().is_some(),
            source_priority: notice.source.priority(),
            title_len: notice.title.chars().count(),
            title: &notice.title,
            id: &notice.id,
        }
    }
}

/// Dedup key for `notice`, or `None` when its title normalizes to nothing.
pub fn dedup_key(notice: &Notice) -> Option<String> {
    let title = normalize_title(&notice.title);
    if title.is_empty() {
        return None;
    }

    let schedule = notice.period_text().unwrap_or(&notice.deadline);
    if !schedule.is_empty() {
        return Some(format!("{title}{SEP}{schedule}"));
    }

    let org = normalize_title(notice.org_text().unwrap_or_default());
    Some(format!("{title}{SEP}{org}{SEP}{}", notice.deadline))
}

/// Collapse duplicates, returning survivors and the number of collisions.
///
/// Records whose title normalizes to an empty string are dropped without
/// being counted. Survivors keep the position of the first record seen for
/// their key.
#[instrument(level = "info", skip_all, fields(input = notices.len()))]
pub fn dedupe(notices: Vec<Notice>) -> (Vec<Notice>, usize) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Notice> = Vec::with_capacity(notices.len());
    let mut removed = 0usize;

    for notice in notices {
        let Some(key) = dedup_key(&notice) else {
            debug!(id = %notice.id, "Dropping notice with empty normalized title");
            continue;
        };

        match index.get(&key).copied() {
            None => {
                index.insert(key, kept.len());
                kept.push(notice);
            }
            Some(slot) => {
                removed += 1;
                if QualityScore::of(&notice) > QualityScore::of(&kept[slot]) {
                    debug!(winner = %notice.id, loser = %kept[slot].id, "Duplicate replaced");
                    kept[slot] = notice;
                } else {
                    debug!(winner = %kept[slot].id, loser = %notice.id, "Duplicate discarded");
                }
            }
        }
    }

    info!(kept = kept.len(), removed, "Deduplication complete");
    (kept, removed)
}
