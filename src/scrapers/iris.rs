//! IRIS national R&D notice-board scraper.
//!
//! Each list item calls `f_bsnsAncmBtinSituListForm_view('<ancmId>','<ancmPrg>')`
//! and carries the announcing institution, the title and the notice date.
//! The list does not show deadlines, so every IRIS record is undated.

use super::{ScrapeContext, cap};
use crate::models::{Notice, Source};
use crate::text::clean;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use tracing::{info, instrument};

const LIST_URL: &str = "https://www.iris.go.kr/contents/retrieveBsnsAncmBtinSituListView.do";
const VIEW_URL: &str = "https://www.iris.go.kr/contents/retrieveBsnsAncmView.do";
const LIMIT: usize = 120;

static RE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?s)f_bsnsAncmBtinSituListForm_view\('(\d+)'\s*,\s*'([^']+)'\).*?"#,
        r#"<span class="inst_title">(.*?)</span>.*?"#,
        r#"<strong class="title"><a [^>]*>(.*?)</a></strong>.*?"#,
        r#"<span class="ancmDe"><em>공고일자\s*:</em>\s*([0-9\-]{10})</span>"#,
    ))
    .expect("iris item regex")
});

/// Fetch and parse the notice board.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let html = ctx.client.get(LIST_URL).await?;
    let notices = parse(&html);
    info!(count = notices.len(), source = LIST_URL, "Parsed IRIS announcements");
    Ok(notices)
}

pub fn parse(html: &str) -> Vec<Notice> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for c in RE_ITEM.captures_iter(html) {
        let (ancm_id, ancm_prg) = (&c[1], &c[2]);
        let title = clean(&c[4]);
        if title.is_empty() || !seen.insert(ancm_id.to_string()) {
            continue;
        }

        let mut notice = Notice::new(
            Source::Iris,
            ancm_id,
            title,
            clean(&c[3]),
            format!("{VIEW_URL}?ancmId={ancm_id}&ancmPrg={ancm_prg}"),
        );
        notice.reg_date = Some(c[5].to_string());
        out.push(notice);
    }

    cap(out, LIMIT, Source::Iris)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, prg: &str, inst: &str, title: &str, date: &str) -> String {
        format!(
            r##"<li>
  <a href="javascript:void(0);" onclick="f_bsnsAncmBtinSituListForm_view('{id}', '{prg}'); return false;">
    <span class="inst_title">{inst}</span>
    <strong class="title"><a href="#">{title}</a></strong>
    <span class="ancmDe"><em>공고일자 :</em> {date}</span>
  </a>
</li>"##
        )
    }

    #[test]
    fn test_parse_items() {
        let html = format!(
            "<ul>{}{}</ul>",
            item("012345", "ancmIng", "과학기술정보통신부 &gt; 한국연구재단", "2024년 <em>기초연구</em> 신규과제", "2024-02-20"),
            item("012346", "ancmPre", "산업통상자원부", "소재부품 기술개발", "2024-02-21"),
        );
        let notices = parse(&html);
        assert_eq!(notices.len(), 2);

        let n = &notices[0];
        assert_eq!(n.id, "i-012345");
        assert_eq!(n.category, "과학기술정보통신부 > 한국연구재단");
        assert_eq!(n.title, "2024년 기초연구 신규과제");
        assert_eq!(n.deadline, "");
        assert_eq!(n.dday, None);
        assert_eq!(n.reg_date.as_deref(), Some("2024-02-20"));
        assert_eq!(
            n.url,
            "https://www.iris.go.kr/contents/retrieveBsnsAncmView.do?ancmId=012345&ancmPrg=ancmIng"
        );
    }

    #[test]
    fn test_parse_dedups_by_id() {
        let html = format!(
            "{}{}",
            item("1", "a", "inst", "same", "2024-01-01"),
            item("1", "a", "inst", "same again", "2024-01-01"),
        );
        assert_eq!(parse(&html).len(), 1);
    }
}
