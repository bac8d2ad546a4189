//! egbiz (Gyeonggi business support) AJAX calendar scraper.
//!
//! The calendar endpoint returns the programs of one month per request, so
//! the adapter posts all twelve month indices and merges the rows by
//! `bizCyclId`. The merged list is ordered by urgency before the cap is
//! applied, so the cap drops the least urgent programs.

use super::{ScrapeContext, cap, first_non_empty, lenient_string};
use crate::models::{Notice, Source, optional};
use crate::text::{days_until_from, normalize_date};
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use tracing::{debug, info, instrument, warn};

const API_URL: &str = "https://www.egbiz.or.kr/sp/selectSupportPrjListAjax.do";
const DETAIL_URL: &str = "https://www.egbiz.or.kr/mainHotDetail.do";
const LIMIT: usize = 180;
const MONTHS: std::ops::RangeInclusive<u32> = 1..=12;
const DEFAULT_CATEGORY: &str = "기타";

const HEADERS: &[(&str, &str)] = &[
    ("Origin", "https://www.egbiz.or.kr"),
    ("Referer", "https://www.egbiz.or.kr/index.do"),
];

/// One month of the calendar response.
#[derive(Debug, Default, Deserialize)]
pub struct MonthPage {
    #[serde(default)]
    pub value: Option<Vec<Program>>,
}

/// A support program as returned by the calendar endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default, deserialize_with = "lenient_string")]
    pub biz_cycl_id: Option<String>,
    #[serde(default)]
    pub biz_nm: Option<String>,
    #[serde(default)]
    pub aply_bgng_dt: Option<String>,
    #[serde(default)]
    pub aply_end_dt: Option<String>,
    #[serde(default)]
    pub category_nm: Option<String>,
    #[serde(default)]
    pub outsd_inst_nm: Option<String>,
    #[serde(default)]
    pub instt_nm: Option<String>,
    #[serde(default)]
    pub mdfcn_dt: Option<String>,
}

/// Post every month index and merge the results.
#[instrument(level = "info", skip_all)]
pub async fn collect(ctx: &ScrapeContext<'_>) -> Result<Vec<Notice>, Box<dyn Error>> {
    let notices = collect_months(
        move |month| async move {
            let month_field = month.to_string();
            let fields = [("month", month_field.as_str()), ("day", "1"), ("sortCd", "bizCyclId")];
            ctx.client
                .post_form(API_URL, &fields, HEADERS)
                .await
                .map_err(|e| Box::new(e) as Box<dyn Error>)
        },
        ctx.today,
    )
    .await?;
    info!(count = notices.len(), source = API_URL, "Parsed egbiz programs");
    Ok(notices)
}

/// Request all twelve months through `fetch_month`, merge, order and cap.
///
/// A failed or malformed month fails the whole adapter.
pub async fn collect_months<F, Fut>(mut fetch_month: F, today: NaiveDate) -> Result<Vec<Notice>, Box<dyn Error>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, Box<dyn Error>>>,
{
    let mut merged = BTreeMap::new();

    for month in MONTHS {
        let raw = fetch_month(month).await?;
        let page = parse_page(&raw).inspect_err(|e| {
            warn!(month, error = %e, body = %truncate_for_log(&raw, 300), "Malformed egbiz response");
        })?;
        let rows = page.value.unwrap_or_default();
        debug!(month, rows = rows.len(), "Fetched egbiz month");
        merge_programs(&mut merged, rows, today);
    }

    Ok(finish(merged))
}

pub fn parse_page(raw: &str) -> Result<MonthPage, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Add unseen programs to `merged`; the first occurrence of an id wins.
pub fn merge_programs(merged: &mut BTreeMap<String, Notice>, rows: Vec<Program>, today: NaiveDate) {
    for program in rows {
        let Some(id) = program.biz_cycl_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if merged.contains_key(id) {
            continue;
        }
        if let Some(notice) = to_notice(id, &program, today) {
            merged.insert(id.to_string(), notice);
        }
    }
}

fn to_notice(id: &str, p: &Program, today: NaiveDate) -> Option<Notice> {
    let title = first_non_empty(&[p.biz_nm.as_deref()]);
    if title.is_empty() {
        return None;
    }
    let deadline = normalize_date(first_non_empty(&[p.aply_end_dt.as_deref()]));
    let start = normalize_date(first_non_empty(&[p.aply_bgng_dt.as_deref()]));
    let category = match first_non_empty(&[p.category_nm.as_deref()]) {
        "" => DEFAULT_CATEGORY,
        c => c,
    };

    let mut notice = Notice::new(
        Source::Egbiz,
        id,
        title,
        category,
        format!("{DETAIL_URL}?bizCyclId={id}"),
    );
    notice.dday = days_until_from(&deadline, today);
    if !start.is_empty() && !deadline.is_empty() {
        notice.period = Some(format!("{start} ~ {deadline}"));
    }
    notice.org = optional(first_non_empty(&[p.outsd_inst_nm.as_deref(), p.instt_nm.as_deref()]));
    notice.reg_date = optional(first_non_empty(&[p.mdfcn_dt.as_deref()]));
    notice.deadline = deadline;
    Some(notice)
}

/// Order merged programs by urgency and apply the cap.
pub fn finish(merged: BTreeMap<String, Notice>) -> Vec<Notice> {
    let mut notices: Vec<Notice> = merged.into_values().collect();
    notices.sort_by(|a, b| {
        let key = |n: &Notice| {
            (
                n.dday.unwrap_or(9999),
                if n.deadline.is_empty() { "9999-12-31".to_string() } else { n.deadline.clone() },
            )
        };
        key(a).cmp(&key(b))
    });
    cap(notices, LIMIT, Source::Egbiz)
}
