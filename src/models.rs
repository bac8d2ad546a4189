//! Data models for scraped announcements and the published feed.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: The seven portals announcements are collected from
//! - [`Notice`]: One announcement, both as an adapter candidate and as a
//!   deduplicated record
//! - [`SourceError`]: A per-source failure, downgraded to a label and message
//! - [`RunPayload`]: The snapshot written to disk at the end of a run
//!
//! Field names are serialized in camelCase because downstream consumers read
//! the feed from a browser context.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A public portal that publishes business-support announcements.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// K-Startup ongoing announcements.
    #[value(name = "kstartup")]
    KStartup,
    /// Bizinfo support-program board.
    Bizinfo,
    /// IRIS national R&D notice board.
    Iris,
    /// Gyeonggi business support AJAX calendar.
    Egbiz,
    /// SMTECH R&D monthly schedule.
    Smtech,
    /// SMES24 application list with popup links.
    Smes24,
    /// Integrated subsidy portal (bojo.go.kr).
    Gosims,
}

impl Source {
    /// Every source, in the order the aggregator runs them.
    pub const ALL: [Source; 7] = [
        Source::KStartup,
        Source::Bizinfo,
        Source::Iris,
        Source::Egbiz,
        Source::Smtech,
        Source::Smes24,
        Source::Gosims,
    ];

    /// Stable lowercase label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Source::KStartup => "kstartup",
            Source::Bizinfo => "bizinfo",
            Source::Iris => "iris",
            Source::Egbiz => "egbiz",
            Source::Smtech => "smtech",
            Source::Smes24 => "smes24",
            Source::Gosims => "gosims",
        }
    }

    /// Static reliability ranking used to break ties in dedup and ranking.
    ///
    /// The integrated subsidy portal is the most trusted, the institutional
    /// notice board (IRIS) the least.
    pub fn priority(self) -> u8 {
        match self {
            Source::Gosims => 100,
            Source::Smtech => 95,
            Source::KStartup => 90,
            Source::Bizinfo => 85,
            Source::Egbiz => 80,
            Source::Smes24 => 75,
            Source::Iris => 70,
        }
    }

    /// Prefix for identifiers produced by this source's adapter.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Source::KStartup => "k",
            Source::Bizinfo => "b",
            Source::Iris => "i",
            Source::Egbiz => "e",
            Source::Smtech => "smt",
            Source::Smes24 => "s24",
            Source::Gosims => "g",
        }
    }

    /// Build an adapter-scoped identifier, e.g. `k-175001`.
    pub fn notice_id(self, raw: &str) -> String {
        format!("{}-{}", self.id_prefix(), raw)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single announcement.
///
/// Adapters produce candidates of this shape; the deduplicator keeps one
/// survivor per dedup key without recording which candidates it absorbed.
///
/// # Invariants
///
/// * `title` is never empty; adapters drop rows without one.
/// * `deadline` is either `YYYY-MM-DD` or empty.
/// * `dday` is `None` when the deadline is unknown, unless the source
///   reports its own countdown (K-Startup's `D-n` badge).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// Source-prefixed identifier, unique within one adapter's output.
    pub id: String,
    pub source: Source,
    pub title: String,
    /// Free-text classification in the source's own vocabulary.
    pub category: String,
    #[serde(default)]
    pub deadline: String,
    /// Days from today to the deadline; negative once expired.
    pub dday: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reg_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// Application status code as reported by SMES24.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Contact institution code as reported by SMES24.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cntc_instt_cd: Option<String>,
    /// Notice sequence number as reported by SMES24.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pblanc_seq: Option<String>,
    pub url: String,
}

impl Notice {
    /// Create a notice with the required fields; enrichment fields start empty.
    pub fn new(
        source: Source,
        raw_id: &str,
        title: impl Into<String>,
        category: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Notice {
            id: source.notice_id(raw_id),
            source,
            title: title.into(),
            category: category.into(),
            deadline: String::new(),
            dday: None,
            period: None,
            reg_date: None,
            org: None,
            status: None,
            cntc_instt_cd: None,
            pblanc_seq: None,
            url: url.into(),
        }
    }

    pub fn has_deadline(&self) -> bool {
        !self.deadline.is_empty()
    }

    /// Period text, treating an empty string as absent.
    pub fn period_text(&self) -> Option<&str> {
        non_empty(self.period.as_deref())
    }

    /// Organisation text, treating an empty string as absent.
    pub fn org_text(&self) -> Option<&str> {
        non_empty(self.org.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Wrap a possibly-empty string as an optional enrichment field.
pub fn optional(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.is_empty() { None } else { Some(s) }
}

/// A failure of one source adapter, recorded instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub source: Source,
    pub message: String,
}

impl SourceError {
    pub fn new(source: Source, message: impl Into<String>) -> Self {
        SourceError {
            source,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// The feed snapshot written at the end of every run.
///
/// Constructed fresh each run and never mutated after it is written; the
/// writer replaces any prior artifact wholesale.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPayload {
    /// Local wall-clock time of the run, `YYYY-MM-DD HH:MM:SS`.
    pub updated_at: String,
    pub count: usize,
    pub before_dedupe_count: usize,
    pub dedup_removed: usize,
    pub no_deadline_count: usize,
    pub source_stats: BTreeMap<Source, usize>,
    pub errors: Vec<String>,
    pub notices: Vec<Notice>,
}
