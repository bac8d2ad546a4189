//! SMES24 application-list scraper.
//!
//! Rows in the list open a popup through
//! `fn_include_popOpen2('<seq>','<index>','<cntcCd>','<pblancId>','<org>','<status>')`.
//! The popup's detail link is not on the row: an inline script maps the
//! popup index to it with blocks like
//! `if(index == "3"){ ... fn_popupDtl('..', '<link>' ...`.
//! Both are parsed from the same page and joined on the index.
//!
//! When the script has no entry for an index the link falls back according
//! to [`MissingDetailLink`], and the number of fallbacks is logged.

use super::{ScrapeContext, cap};
use crate::config::MissingDetailLink;
use crate::models::{Notice, Source, optional};
use crate::text::{clean, days_until_from, extract_deadline_from_text};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use tracing::{info, instrument, warn};

const LIST_URL: &str = "https://www.smes.go.kr/main/bizApply";
const BIZINFO_VIEW_URL: &str = "https://www.bizinfo.go.kr/web/lay1/bbs/S1T122C128/AS/74/view.do";
const LIMIT: usize = 200;
const MIN_CELLS: usize = 6;
const DEFAULT_CATEGORY: &str = "지원사업";

static RE_POPUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)if\(index\s*==\s*"(\d+)"\)\{.*?fn_popupDtl\('[^']*',\s*'([^']+)'"#)
        .expect("popup regex")
});
static RE_TBODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tbody>(.*?)</tbody>").expect("tbody regex"));
static RE_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<tr>.*?</tr>").expect("row regex"));
static RE_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("cell regex"));
static RE_ARGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"fn_include_popOpen2\('([^']*)','([^']*)',\s*'([^']*)',\s*",
        r"'([^']*)','([^']*)',\s*'([^']*)'\)",
    ))
    .expect("popup args regex")
});
static RE_ANCHOR_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<a [^>]*title="([^"]+)""#).expect("anchor title regex"));

/// Fetch and parse the application list.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let html = ctx.client.get(LIST_URL).await?;
    let notices = parse(&html, ctx.today, ctx.config.smes24_missing_detail);
    info!(count = notices.len(), source = LIST_URL, "Parsed SMES24 announcements");
    Ok(notices)
}

/// Map popup index to detail link from the page's inline script.
pub fn popup_links(html: &str) -> HashMap<String, String> {
    RE_POPUP
        .captures_iter(html)
        .map(|c| (c[1].to_string(), c[2].replace("|amp;", "&")))
        .collect()
}

fn fallback_link(policy: MissingDetailLink, pblanc_id: &str) -> String {
    match policy {
        MissingDetailLink::Bizinfo => format!("{BIZINFO_VIEW_URL}?pblancId={pblanc_id}"),
        MissingDetailLink::ListPage => LIST_URL.to_string(),
    }
}

pub fn parse(html: &str, today: NaiveDate, missing_detail: MissingDetailLink) -> Vec<Notice> {
    let links = popup_links(html);
    let Some(tbody) = RE_TBODY.captures(html) else {
        warn!("SMES24 page has no table body");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut fallbacks = 0usize;

    for row in RE_ROW.find_iter(&tbody[1]) {
        let row = row.as_str();
        let Some(args) = RE_ARGS.captures(row) else {
            continue;
        };
        let (pblanc_seq, idx, cntc_cd, pblanc_id, org_arg, status) =
            (&args[1], &args[2], &args[3], &args[4], &args[5], &args[6]);
        if !seen.insert(pblanc_id.to_string()) {
            continue;
        }

        let cells: Vec<&str> = RE_CELL
            .captures_iter(row)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let title = match RE_ANCHOR_TITLE.captures(row) {
            Some(t) => clean(&t[1]),
            None => clean(cells[1]),
        };
        if title.is_empty() {
            continue;
        }

        let period = clean(cells[2]);
        let category = match clean(cells[4]) {
            c if c.is_empty() => DEFAULT_CATEGORY.to_string(),
            c => c,
        };
        let org = match clean(cells[5]) {
            o if o.is_empty() => org_arg.trim().to_string(),
            o => o,
        };
        let deadline = extract_deadline_from_text(&period);

        let url = match links.get(idx) {
            Some(link) => link.clone(),
            None => {
                fallbacks += 1;
                fallback_link(missing_detail, pblanc_id)
            }
        };

        let mut notice = Notice::new(Source::Smes24, pblanc_id, title, category, url);
        notice.dday = days_until_from(&deadline, today);
        notice.deadline = deadline;
        notice.period = optional(period);
        notice.org = optional(org);
        notice.status = optional(status);
        notice.cntc_instt_cd = optional(cntc_cd);
        notice.pblanc_seq = optional(pblanc_seq);
        out.push(notice);
    }

    if fallbacks > 0 {
        info!(fallbacks, policy = ?missing_detail, "SMES24 rows without popup link used fallback URL");
    }
    cap(out, LIMIT, Source::Smes24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::test_support::today;

    const SCRIPT: &str = r#"<script>
function fn_popOpen(index){
    if(index == "0"){
        fn_popupDtl('P', 'https://www.smes.go.kr/sfc/detail?pblancId=SME001|amp;cntcCd=A');
    }
    if(index == "1"){
        fn_popupDtl('P', 'https://www.smes.go.kr/sfc/detail?pblancId=SME002');
    }
}
</script>"#;

    fn row(idx: &str, pblanc_id: &str, title_attr: Option<&str>, period: &str, category: &str, org: &str) -> String {
        let title = title_attr
            .map(|t| format!(r#" title="{t}""#))
            .unwrap_or_default();
        format!(
            r#"<tr>
<td>1</td>
<td><a href="javascript:void(0);"{title} onclick="fn_include_popOpen2('77','{idx}', 'C01', '{pblanc_id}','args기관', 'Y')">셀 제목</a></td>
<td>{period}</td>
<td>중소기업</td>
<td>{category}</td>
<td>{org}</td>
</tr>"#
        )
    }

    fn page(rows: &[String]) -> String {
        format!("<html>{SCRIPT}<table><tbody>{}</tbody></table></html>", rows.join("\n"))
    }

    #[test]
    fn test_popup_links() {
        let links = popup_links(SCRIPT);
        assert_eq!(links.len(), 2);
        assert_eq!(links["0"], "https://www.smes.go.kr/sfc/detail?pblancId=SME001&cntcCd=A");
    }

    #[test]
    fn test_parse_rows() {
        let html = page(&[row(
            "0",
            "SME001",
            Some("2024 스마트 제조혁신 지원"),
            "2024.02.01 ~ 2024.03.15",
            "기술",
            "중소기업기술정보진흥원",
        )]);
        let notices = parse(&html, today(), MissingDetailLink::Bizinfo);
        assert_eq!(notices.len(), 1);

        let n = &notices[0];
        assert_eq!(n.id, "s24-SME001");
        assert_eq!(n.title, "2024 스마트 제조혁신 지원");
        assert_eq!(n.category, "기술");
        assert_eq!(n.org.as_deref(), Some("중소기업기술정보진흥원"));
        assert_eq!(n.deadline, "2024-03-15");
        assert_eq!(n.dday, Some(14));
        assert_eq!(n.period.as_deref(), Some("2024.02.01 ~ 2024.03.15"));
        assert_eq!(n.status.as_deref(), Some("Y"));
        assert_eq!(n.cntc_instt_cd.as_deref(), Some("C01"));
        assert_eq!(n.pblanc_seq.as_deref(), Some("77"));
        assert_eq!(n.url, "https://www.smes.go.kr/sfc/detail?pblancId=SME001&cntcCd=A");
    }

    #[test]
    fn test_cell_fallbacks() {
        let html = page(&[row("1", "SME002", None, "상시", "", "")]);
        let n = &parse(&html, today(), MissingDetailLink::Bizinfo)[0];
        assert_eq!(n.title, "셀 제목");
        assert_eq!(n.category, "지원사업");
        assert_eq!(n.org.as_deref(), Some("args기관"));
        assert_eq!(n.deadline, "");
        assert_eq!(n.dday, None);
    }

    #[test]
    fn test_missing_popup_link_policy() {
        let html = page(&[row("9", "PBLN_000000000099999", Some("x"), "", "a", "b")]);

        let n = &parse(&html, today(), MissingDetailLink::Bizinfo)[0];
        assert_eq!(
            n.url,
            "https://www.bizinfo.go.kr/web/lay1/bbs/S1T122C128/AS/74/view.do?pblancId=PBLN_000000000099999"
        );

        let n = &parse(&html, today(), MissingDetailLink::ListPage)[0];
        assert_eq!(n.url, "https://www.smes.go.kr/main/bizApply");
    }

    #[test]
    fn test_repeated_ids_and_missing_tbody() {
        let html = page(&[
            row("0", "SME001", Some("first"), "", "a", "b"),
            row("1", "SME001", Some("second"), "", "a", "b"),
        ]);
        assert_eq!(parse(&html, today(), MissingDetailLink::Bizinfo).len(), 1);
        assert!(parse("<table></table>", today(), MissingDetailLink::Bizinfo).is_empty());
    }
}
