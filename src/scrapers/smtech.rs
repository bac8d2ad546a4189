//! SMTECH R&D monthly schedule scraper.
//!
//! The schedule is a calendar grid. Every cell links to
//! `notice02_list.do?...ancmId=<id>` and wraps an icon whose `title`
//! attribute holds both the announcement name and its application period,
//! e.g. `"2024년 창업성장기술개발 2024.03.04 ~ 2024.03.25"`.

use super::{ScrapeContext, cap};
use crate::models::{Notice, Source};
use crate::text::{clean, days_until_from, extract_deadline_from_text};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use tracing::{info, instrument, warn};
use url::Url;

const BASE_URL: &str = "https://www.smtech.go.kr";
const LIST_URL: &str = "https://www.smtech.go.kr/front/ifg/no/notice02_intro.do";
const LIMIT: usize = 120;
const CATEGORY: &str = "R&D 사업공고";

static RE_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?s)<a\s+href="([^"]*notice02_list\.do[^"]*ancmId=([^&"]+)[^"]*)"[^>]*>\s*"#,
        r#"(?:.*?)<img[^>]*title="([^"]+)""#,
    ))
    .expect("smtech cell regex")
});
static RE_TRAILING_PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\d{4}[.\-]\d{2}[.\-]\d{2}\s*[~～\-]\s*\d{4}[.\-]\d{2}[.\-]\d{2}\s*$")
        .expect("trailing period regex")
});
static RE_JSESSIONID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i);jsessionid=[^?]+").expect("jsessionid regex"));

/// Fetch and parse the monthly schedule.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let html = ctx.client.get(LIST_URL).await?;
    let notices = parse(&html, ctx.today)?;
    info!(count = notices.len(), source = LIST_URL, "Parsed SMTECH announcements");
    Ok(notices)
}

/// Split the icon title into the announcement name and its deadline.
///
/// The name falls back to the whole blob when stripping the period would
/// leave nothing.
pub fn split_title(blob: &str) -> (String, String) {
    let blob = clean(blob);
    let deadline = extract_deadline_from_text(&blob);
    let title = RE_TRAILING_PERIOD.replace(&blob, "").trim().to_string();
    if title.is_empty() { (blob, deadline) } else { (title, deadline) }
}

/// Turn a schedule link into an absolute URL without a session id.
pub fn canonical_link(base: &Url, href: &str) -> Result<String, url::ParseError> {
    let href = href.replace("&amp;", "&");
    let href = RE_JSESSIONID.replace(&href, "");
    Ok(base.join(&href)?.to_string())
}

pub fn parse(html: &str, today: NaiveDate) -> Result<Vec<Notice>, Box<dyn Error>> {
    let base = Url::parse(BASE_URL)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for c in RE_CELL.captures_iter(html) {
        let (href, ancm_id) = (&c[1], &c[2]);
        if !seen.insert(ancm_id.to_string()) {
            continue;
        }
        let (title, deadline) = split_title(&c[3]);
        if title.is_empty() {
            continue;
        }
        let url = match canonical_link(&base, href) {
            Ok(url) => url,
            Err(e) => {
                warn!(%href, error = %e, "Unresolvable SMTECH link; skipping cell");
                continue;
            }
        };

        let mut notice = Notice::new(Source::Smtech, ancm_id, title, CATEGORY, url);
        notice.dday = days_until_from(&deadline, today);
        notice.deadline = deadline;
        out.push(notice);
    }

    Ok(cap(out, LIMIT, Source::Smtech))
}
