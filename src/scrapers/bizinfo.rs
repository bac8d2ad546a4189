//! Bizinfo support-program board scraper.
//!
//! The board is a plain HTML table. Announcement rows link to a view page
//! carrying `pblancId=PBLN_<digits>`; the columns we read are:
//!
//! | Cell | Content |
//! |------|---------|
//! | 1 | category |
//! | 2 | title anchor |
//! | 3 | application period (`start ~ end`) |
//! | 6 | registration date |

use super::{ScrapeContext, cap};
use crate::models::{Notice, Source, optional};
use crate::text::{clean, days_until_from};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::error::Error;
use tracing::{info, instrument, warn};
use url::Url;

const BASE_URL: &str = "https://www.bizinfo.go.kr";
const LIST_URL: &str = "https://www.bizinfo.go.kr/web/lay1/bbs/S1T122C128/AS/74/list.do";
const LIMIT: usize = 140;
const MIN_CELLS: usize = 7;

static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*?pblancId=(PBLN_[0-9]+)").expect("bizinfo link regex"));
static RE_PERIOD_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~\s*([0-9]{4}-[0-9]{2}-[0-9]{2})").expect("period end regex"));

/// Fetch and parse the first page of the support-program board.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let html = ctx.client.get(LIST_URL).await?;
    let notices = parse(&html, ctx.today)?;
    info!(count = notices.len(), source = LIST_URL, "Parsed Bizinfo announcements");
    Ok(notices)
}

// Inline markup must not split words, so the cell is cleaned as one HTML string.
fn cell_text(cell: &ElementRef<'_>) -> String {
    clean(&cell.inner_html())
}

/// Extract announcement rows from the board table.
pub fn parse(html: &str, today: NaiveDate) -> Result<Vec<Notice>, Box<dyn Error>> {
    let base = Url::parse(BASE_URL)?;
    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("td")?;
    let link_selector = Selector::parse(r#"a[href*="pblancId=PBLN_"]"#)?;
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_selector).collect();
        if cells.len() < MIN_CELLS {
            continue;
        }
        let Some(anchor) = cells[2].select(&link_selector).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        // drop paging/search parameters trailing the announcement id
        let Some(link) = RE_LINK.captures(href) else {
            continue;
        };
        let pid = link[1].to_string();
        let title = cell_text(&anchor);
        if title.is_empty() || !seen.insert(pid.clone()) {
            continue;
        }

        let url = match base.join(&link[0]) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!(%href, error = %e, "Unresolvable Bizinfo link; skipping row");
                continue;
            }
        };

        let period = cell_text(&cells[3]);
        let deadline = RE_PERIOD_END
            .captures(&period)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let mut notice = Notice::new(Source::Bizinfo, &pid, title, cell_text(&cells[1]), url);
        notice.dday = days_until_from(&deadline, today);
        notice.deadline = deadline;
        notice.period = optional(period);
        notice.reg_date = optional(cell_text(&cells[6]));
        out.push(notice);
    }

    Ok(cap(out, LIMIT, Source::Bizinfo))
}
