//! Text and date normalization shared by every source adapter.
//!
//! Announcement portals mix markup, HTML entities and half a dozen date
//! spellings into the fields we care about. The helpers here turn those into
//! plain text and `YYYY-MM-DD` strings:
//!
//! - [`clean`]: strip tags, decode entities, collapse whitespace
//! - [`normalize_date`]: canonicalize one date-like string
//! - [`extract_deadline_from_text`]: pick the deadline out of a period blob
//! - [`days_until_from`]: signed D-day count against an injected date
//! - [`normalize_title`]: fuzzy-matching key for deduplication
//!
//! None of these functions fail: unparseable input yields an empty string or
//! `None`.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

// Only HTML element names count as markup, so bracketed title text such as
// `<2024 창업지원>` or `< 10억 >` survives repeated passes.
static RE_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?is)<!--.*?-->|",
        r"</?(?:a|b|br|dd|div|dl|dt|em|font|h[1-6]|i|img|input|label|li|ol|p|",
        r"script|small|span|strong|style|sub|sup|table|tbody|td|th|thead|tr|u|ul)\b[^<>]*/?>",
    ))
    .expect("tag regex")
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static RE_FULL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})").expect("full date regex")
});
static RE_SHORT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\D)(\d{2})[./\-](\d{1,2})[./\-](\d{1,2})").expect("short date regex")
});
static RE_COMPACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)").expect("compact date regex"));

static RE_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("parens regex"));
static RE_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("brackets regex"));
static RE_TITLE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{4}[./\-][0-9]{1,2}[./\-][0-9]{1,2}").expect("title date regex")
});
static RE_NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9a-z가-힣]+").expect("non-word regex"));

fn clean_once(raw: &str) -> String {
    let stripped = RE_TAGS.replace_all(raw, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// Strip markup, decode HTML entities and collapse whitespace.
///
/// Decoding can surface new markup or entities (`&amp;lt;b&amp;gt;`), so the
/// pass is repeated until the text stops changing. Decoded angle brackets
/// that do not form an HTML element are kept as text. Every pass that changes the
/// text either shortens it or only rewrites whitespace, so the loop ends, and
/// the result is a fixed point: `clean(clean(x)) == clean(x)`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean("<b>A</b>&amp;B"), "A&B");
/// ```
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Canonicalize a date string to `YYYY-MM-DD`.
///
/// Accepts `.`, `/` and `-` separators, one- or two-digit months and days,
/// two-digit years (read as `20YY`) and compact `YYYYMMDD`. Returns an empty
/// string when nothing date-like is found or the date does not exist.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_date("24.03.05"), "2024-03-05");
/// assert_eq!(normalize_date("not a date"), "");
/// ```
pub fn normalize_date(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    RE_FULL_DATE
        .captures_iter(s)
        .find_map(|c| ymd(&c[1], &c[2], &c[3]))
        .or_else(|| {
            RE_SHORT_DATE
                .captures_iter(s)
                .find_map(|c| ymd(&format!("20{}", &c[1]), &c[2], &c[3]))
        })
        .or_else(|| RE_COMPACT_DATE.captures_iter(s).find_map(|c| ymd(&c[1], &c[2], &c[3])))
        .map(format_date)
        .unwrap_or_default()
}

/// Find the deadline inside free text such as `"2024.01.01~2024.03.31 접수"`.
///
/// Announcements list the start date before the end date, so the last
/// four-digit-year date wins. Without any, the last two-digit-year date is
/// used with a `20` prefix. Returns an empty string when no valid date exists.
pub fn extract_deadline_from_text(blob: &str) -> String {
    let full = RE_FULL_DATE
        .captures_iter(blob)
        .filter_map(|c| ymd(&c[1], &c[2], &c[3]))
        .last();
    if let Some(date) = full {
        return format_date(date);
    }

    RE_SHORT_DATE
        .captures_iter(blob)
        .filter_map(|c| ymd(&format!("20{}", &c[1]), &c[2], &c[3]))
        .last()
        .map(format_date)
        .unwrap_or_default()
}

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Signed days from `today` to `deadline`; `None` if the deadline does not parse.
pub fn days_until_from(deadline: &str, today: NaiveDate) -> Option<i64> {
    let deadline = NaiveDate::parse_from_str(deadline.trim(), "%Y-%m-%d").ok()?;
    Some((deadline - today).num_days())
}

/// Reduce a title to a lowercase token string used only as a dedup key.
///
/// Parenthetical and bracketed asides and embedded dates are removed, as is
/// anything that is not an ASCII letter, digit or Hangul syllable.
pub fn normalize_title(title: &str) -> String {
    let s = clean(title).to_lowercase();
    let s = RE_PARENS.replace_all(&s, " ");
    let s = RE_BRACKETS.replace_all(&s, " ");
    let s = RE_TITLE_DATE.replace_all(&s, " ");
    let s = RE_NON_WORD.replace_all(&s, " ");
    RE_WS.replace_all(&s, " ").trim().to_string()
}
