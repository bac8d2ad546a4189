//! K-Startup ongoing-announcement scraper.
//!
//! The list page renders each announcement as a card whose anchor calls
//! `go_view(<pbancSn>)`. Inside the card, in order, sit a category flag, a
//! `D-<n>` countdown badge, a `마감일자 YYYY-MM-DD` label and the title
//! paragraph.

use super::{ScrapeContext, cap};
use crate::models::{Notice, Source};
use crate::text::{clean, days_until_from, normalize_date};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use tracing::{info, instrument};

const LIST_URL: &str = "https://www.k-startup.go.kr/web/contents/bizpbanc-ongoing.do";
const LIMIT: usize = 80;

static RE_CARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?s)go_view\((\d+)\).*?"#,
        r#"<span class="flag type\d+">\s*([^<]+?)\s*</span>.*?"#,
        r#"<span class="flag day">\s*D-(\d+)\s*</span>.*?"#,
        r#"마감일자\s*([0-9\-]{10}).*?"#,
        r#"<p class="tit">\s*(.*?)\s*</p>"#,
    ))
    .expect("kstartup card regex")
});

/// Fetch and parse the ongoing-announcement list.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let html = ctx.client.get(LIST_URL).await?;
    let notices = parse(&html, ctx.today);
    info!(count = notices.len(), source = LIST_URL, "Parsed K-Startup announcements");
    Ok(notices)
}

/// Extract announcement cards from the list page.
///
/// D-day is computed from the deadline label; the badge number is only used
/// when the label does not hold a valid date.
pub fn parse(html: &str, today: NaiveDate) -> Vec<Notice> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for c in RE_CARD.captures_iter(html) {
        let pbanc_sn = &c[1];
        let title = clean(&c[5]);
        if title.is_empty() || !seen.insert(pbanc_sn.to_string()) {
            continue;
        }

        let deadline = normalize_date(&c[4]);
        let badge = c[3].parse::<i64>().ok();
        let mut notice = Notice::new(
            Source::KStartup,
            pbanc_sn,
            title,
            clean(&c[2]),
            format!("{LIST_URL}?schM=view&pbancSn={pbanc_sn}"),
        );
        notice.dday = days_until_from(&deadline, today).or(badge);
        notice.deadline = deadline;
        out.push(notice);
    }

    cap(out, LIMIT, Source::KStartup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::test_support::today;

    fn card(sn: u32, category: &str, badge: u32, deadline: &str, title: &str) -> String {
        format!(
            r#"<li class="notice">
  <a href="javascript:go_view({sn});">
    <div class="flag_agency">
      <span class="flag type03"> {category} </span>
      <span class="flag day">D-{badge}</span>
    </div>
    <div class="bottom"><span class="list">마감일자 {deadline}</span></div>
    <div class="middle"><p class="tit">{title}</p></div>
  </a>
</li>"#
        )
    }

    #[test]
    fn test_parse_cards() {
        let html = format!(
            "<ul>{}{}</ul>",
            card(175001, "사업화", 9, "2024-03-10", "2024년 <b>예비창업</b>패키지"),
            card(175002, "멘토링", 30, "2024-03-31", "글로벌 멘토링 &amp; 컨설팅"),
        );
        let notices = parse(&html, today());
        assert_eq!(notices.len(), 2);

        let first = &notices[0];
        assert_eq!(first.id, "k-175001");
        assert_eq!(first.source, Source::KStartup);
        assert_eq!(first.title, "2024년 예비창업패키지");
        assert_eq!(first.category, "사업화");
        assert_eq!(first.deadline, "2024-03-10");
        assert_eq!(first.dday, Some(9));
        assert!(first.url.ends_with("schM=view&pbancSn=175001"));

        assert_eq!(notices[1].title, "글로벌 멘토링 & 컨설팅");
        assert_eq!(notices[1].dday, Some(30));
    }

    #[test]
    fn test_parse_skips_repeated_ids_and_empty_titles() {
        let html = format!(
            "{}{}{}",
            card(1, "a", 1, "2024-03-02", "First"),
            card(1, "a", 1, "2024-03-02", "Duplicate"),
            card(2, "a", 1, "2024-03-02", "  "),
        );
        let notices = parse(&html, today());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "First");
    }

    #[test]
    fn test_badge_used_when_deadline_invalid() {
        let html = card(3, "a", 12, "2024-99-99", "Odd date");
        let notices = parse(&html, today());
        assert_eq!(notices[0].deadline, "");
        assert_eq!(notices[0].dday, Some(12));
    }

    #[test]
    fn test_parse_caps_output() {
        let html: String = (0..100)
            .map(|i| card(i, "a", 1, "2024-03-02", &format!("Notice {i}")))
            .collect();
        assert_eq!(parse(&html, today()).len(), LIMIT);
    }

    #[test]
    fn test_parse_no_cards() {
        assert!(parse("<html><body>점검 중</body></html>", today()).is_empty());
    }
}
