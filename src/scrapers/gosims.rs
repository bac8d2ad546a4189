//! Integrated subsidy portal (bojo.go.kr) scraper.
//!
//! The portal exposes its open calls through a paged AJAX list. We ask for
//! the current business year, nationwide, filtered to calls that are
//! accepting applications, 200 rows a page. Paging stops at the first short
//! page or after [`MAX_PAGES`] requests.

use super::{ScrapeContext, cap, first_non_empty, lenient_string};
use crate::models::{Notice, Source, optional};
use crate::text::{clean, days_until_from, normalize_date};
use crate::utils::truncate_for_log;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::future::Future;
use tracing::{debug, info, instrument, warn};

const API_URL: &str = "https://www.bojo.go.kr/da/retrieveTaskReqstList.do";
const DETAIL_URL: &str = "https://www.bojo.go.kr/ia/getIA005100Popup.do";
const LIMIT: usize = 240;
pub const PER_PAGE: usize = 200;
pub const MAX_PAGES: usize = 5;

const HEADERS: &[(&str, &str)] = &[
    ("Origin", "https://www.bojo.go.kr"),
    ("Referer", "https://www.bojo.go.kr/bojo.do"),
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    #[serde(default)]
    pub ntbd_list: Option<Vec<Call>>,
}

/// One open call for subsidy applications.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ntt_id: Option<String>,
    #[serde(default)]
    pub sj_cn: Option<String>,
    #[serde(default)]
    pub pblanc_nm: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rcept_begin_de: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rcept_end_de: Option<String>,
    #[serde(default)]
    pub pssrp_instt_nm: Option<String>,
    #[serde(default)]
    pub wdr_instt_nm: Option<String>,
    #[serde(default)]
    pub wrter_cn: Option<String>,
    #[serde(default)]
    pub pblanc_se_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bsns_se: Option<String>,
}

/// Page through the open-call list.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let year = ctx.config.gosims_year.unwrap_or_else(|| ctx.today.year()).to_string();
    let per_page = PER_PAGE.to_string();
    let (year, per_page) = (year.as_str(), per_page.as_str());
    let status = ctx.config.gosims_status.as_str();

    let out = collect_pages(
        move |page| async move {
            let cur_page = page.to_string();
            let fields = [
                ("searchBsnsYear", year),
                ("selSido", ""),
                ("selSigungu", ""),
                ("selectedMultiType", ""),
                ("curPage", cur_page.as_str()),
                ("perPage", per_page),
                ("searchPssrpSttus", status),
            ];
            ctx.client
                .post_form(API_URL, &fields, HEADERS)
                .await
                .map_err(|e| Box::new(e) as Box<dyn Error>)
        },
        ctx.today,
    )
    .await?;

    let notices = cap(out, LIMIT, Source::Gosims);
    info!(count = notices.len(), source = API_URL, "Parsed subsidy portal calls");
    Ok(notices)
}

/// Request pages 1.. through `fetch_page` until a short page or [`MAX_PAGES`].
///
/// Any failed or malformed page fails the whole walk.
pub async fn collect_pages<F, Fut>(mut fetch_page: F, today: NaiveDate) -> Result<Vec<Notice>, Box<dyn Error>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<String, Box<dyn Error>>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for page in 1..=MAX_PAGES {
        let raw = fetch_page(page).await?;
        let rows = parse_page(&raw)
            .inspect_err(|e| {
                warn!(page, error = %e, body = %truncate_for_log(&raw, 300), "Malformed subsidy portal response");
            })?
            .ntbd_list
            .unwrap_or_default();
        let row_count = rows.len();
        debug!(page, rows = row_count, "Fetched subsidy portal page");

        out.extend(merge_calls(&mut seen, rows, today));
        if row_count < PER_PAGE {
            break;
        }
    }
    Ok(out)
}

pub fn parse_page(raw: &str) -> Result<ListPage, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Convert one page of rows, skipping ids already in `seen`.
pub fn merge_calls(seen: &mut HashSet<String>, rows: Vec<Call>, today: NaiveDate) -> Vec<Notice> {
    let mut out = Vec::new();
    for call in rows {
        let id = first_non_empty(&[call.ntt_id.as_deref()]);
        if id.is_empty() || seen.contains(id) {
            continue;
        }
        seen.insert(id.to_string());
        if let Some(notice) = to_notice(id, &call, today) {
            out.push(notice);
        }
    }
    out
}

/// Label for the announcing system (`A` e나라도움, `B` 보탬e).
fn announcement_system(code: &str) -> &'static str {
    match code {
        "A" => "e나라도움",
        "B" => "보탬e",
        _ => "공모사업",
    }
}

/// Label for the funding level (`1` national, `2` local).
fn funding_level(code: &str) -> &'static str {
    match code {
        "1" => "국고",
        "2" => "지방",
        _ => "기타",
    }
}

fn to_notice(id: &str, call: &Call, today: NaiveDate) -> Option<Notice> {
    let title = clean(first_non_empty(&[call.sj_cn.as_deref(), call.pblanc_nm.as_deref()]));
    if title.is_empty() {
        return None;
    }

    let start = normalize_date(first_non_empty(&[call.rcept_begin_de.as_deref()]));
    let end = normalize_date(first_non_empty(&[call.rcept_end_de.as_deref()]));
    let org = clean(first_non_empty(&[
        call.pssrp_instt_nm.as_deref(),
        call.wdr_instt_nm.as_deref(),
        call.wrter_cn.as_deref(),
    ]));
    let category = format!(
        "{} {}",
        announcement_system(first_non_empty(&[call.pblanc_se_code.as_deref()])),
        funding_level(first_non_empty(&[call.bsns_se.as_deref()])),
    );

    let mut notice = Notice::new(
        Source::Gosims,
        id,
        title,
        category,
        format!("{DETAIL_URL}?nttId={id}"),
    );
    notice.dday = days_until_from(&end, today);
    if !start.is_empty() && !end.is_empty() {
        notice.period = Some(format!("{start} ~ {end}"));
    }
    notice.org = optional(org);
    notice.deadline = end;
    Some(notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::test_support::today;
    use serde_json::json;

    const PAGE: &str = r#"{
        "ntbdList": [
            {"nttId": "N100", "sjCn": "2024년 <b>청년</b> 창업 지원사업", "rceptBeginDe": "20240215",
             "rceptEndDe": "2024.03.08", "pssrpInsttNm": "", "wdrInsttNm": "중소벤처기업부",
             "pblancSeCode": "A", "bsnsSe": "1"},
            {"nttId": "N101", "sjCn": "", "pblancNm": "지역 특화 공모", "rceptEndDe": "",
             "wrterCn": "강원특별자치도", "pblancSeCode": "B", "bsnsSe": 2},
            {"nttId": "N100", "sjCn": "duplicate"},
            {"nttId": "", "sjCn": "missing id"},
            {"nttId": "N102", "sjCn": "  "}
        ],
        "totalCnt": 3
    }"#;

    #[test]
    fn test_parse_calls() {
        let page = parse_page(PAGE).unwrap();
        let mut seen = HashSet::new();
        let notices = merge_calls(&mut seen, page.ntbd_list.unwrap(), today());
        assert_eq!(notices.len(), 2);

        let first = &notices[0];
        assert_eq!(first.id, "g-N100");
        assert_eq!(first.title, "2024년 청년 창업 지원사업");
        assert_eq!(first.category, "e나라도움 국고");
        assert_eq!(first.deadline, "2024-03-08");
        assert_eq!(first.dday, Some(7));
        assert_eq!(first.period.as_deref(), Some("2024-02-15 ~ 2024-03-08"));
        assert_eq!(first.org.as_deref(), Some("중소벤처기업부"));
        assert_eq!(first.url, "https://www.bojo.go.kr/ia/getIA005100Popup.do?nttId=N100");

        let second = &notices[1];
        assert_eq!(second.title, "지역 특화 공모");
        assert_eq!(second.category, "보탬e 지방");
        assert_eq!(second.deadline, "");
        assert_eq!(second.period, None);
        assert_eq!(second.org.as_deref(), Some("강원특별자치도"));
    }

    #[test]
    fn test_seen_spans_pages() {
        let mut seen = HashSet::new();
        let first = merge_calls(&mut seen, parse_page(PAGE).unwrap().ntbd_list.unwrap(), today());
        let again = merge_calls(&mut seen, parse_page(PAGE).unwrap().ntbd_list.unwrap(), today());
        assert_eq!(first.len(), 2);
        assert!(again.is_empty());
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        assert_eq!(announcement_system(""), "공모사업");
        assert_eq!(funding_level("9"), "기타");
    }

    fn page_of(ids: impl Iterator<Item = usize>) -> String {
        let rows: Vec<_> = ids
            .map(|i| json!({"nttId": format!("N{i}"), "sjCn": format!("공고 {i}"), "rceptEndDe": "2024-03-20"}))
            .collect();
        json!({ "ntbdList": rows }).to_string()
    }

    #[tokio::test]
    async fn test_short_page_stops_paging() {
        let mut requested = Vec::new();
        let notices = collect_pages(
            |page| {
                requested.push(page);
                let body = if page == 1 { page_of(0..PER_PAGE) } else { page_of(1000..1050) };
                async move { Ok::<_, Box<dyn Error>>(body) }
            },
            today(),
        )
        .await
        .unwrap();
        assert_eq!(requested, vec![1, 2]);
        assert_eq!(notices.len(), PER_PAGE + 50);
        assert_eq!(notices[0].dday, Some(19));
    }

    #[tokio::test]
    async fn test_full_pages_stop_at_max_pages() {
        let mut requested = Vec::new();
        let notices = collect_pages(
            |page| {
                requested.push(page);
                let body = page_of(page * PER_PAGE..(page + 1) * PER_PAGE);
                async move { Ok::<_, Box<dyn Error>>(body) }
            },
            today(),
        )
        .await
        .unwrap();
        assert_eq!(requested, (1..=MAX_PAGES).collect::<Vec<_>>());
        assert_eq!(notices.len(), MAX_PAGES * PER_PAGE);
    }

    #[tokio::test]
    async fn test_seen_carries_across_pages() {
        let notices = collect_pages(
            |page| {
                let body = if page == 1 {
                    page_of(0..PER_PAGE)
                } else {
                    page_of((150..160).chain(500..501))
                };
                async move { Ok::<_, Box<dyn Error>>(body) }
            },
            today(),
        )
        .await
        .unwrap();
        assert_eq!(notices.len(), PER_PAGE + 1);
        assert_eq!(notices.last().map(|n| n.id.as_str()), Some("g-N500"));
    }

    #[tokio::test]
    async fn test_failed_page_fails_adapter() {
        let mut requested = Vec::new();
        let result = collect_pages(
            |page| {
                requested.push(page);
                let body = page_of(0..PER_PAGE);
                async move {
                    if page == 2 {
                        Err::<String, Box<dyn Error>>("HTTP 503".into())
                    } else {
                        Ok(body)
                    }
                }
            },
            today(),
        )
        .await;
        assert_eq!(result.unwrap_err().to_string(), "HTTP 503");
        assert_eq!(requested, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_malformed_page_fails_adapter() {
        let result = collect_pages(
            |_| async { Ok::<_, Box<dyn Error>>("<html>점검 중</html>".to_string()) },
            today(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_list() {
        let page = parse_page(r#"{"ntbdList": null}"#).unwrap();
        assert!(page.ntbd_list.is_none());
    }
}
