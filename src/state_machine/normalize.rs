//! Date and time normalization for extracted slot values
//!
//! Both normalizers are lossless on failure: input they cannot understand is
//! returned unchanged so the calendar can still try to make sense of it.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

static TODAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btoday\b").expect("valid regex"));
static TOMORROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btomorrow\b").expect("valid regex"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{1,2}))?(am|pm)$").expect("valid regex")
});
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})(st|nd|rd|th)\b").expect("valid regex"));
static IN_DAYS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:in\s+(\d{1,3})\s+(day|week)s?|(\d{1,3})\s+(day|week)s?\s+from\s+now)$")
        .expect("valid regex")
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d %Y",
    "%d %B %Y",
    "%A %B %d %Y",
    "%A %d %B %Y",
];

/// Year-less forms; the current year is appended before parsing
const YEARLESS_FORMATS: &[&str] = &["%B %d %Y", "%d %B %Y", "%A %B %d %Y", "%A %d %B %Y"];

/// Replace whole-word "today" and "tomorrow" (any case) with `YYYY-MM-DD`.
pub fn substitute_relative_dates(text: &str, today: NaiveDate) -> String {
    let tomorrow = today + Days::new(1);
    let today_str = today.format("%Y-%m-%d").to_string();
    let tomorrow_str = tomorrow.format("%Y-%m-%d").to_string();

    let text = TODAY_RE.replace_all(text, NoExpand(&today_str));
    TOMORROW_RE
        .replace_all(&text, NoExpand(&tomorrow_str))
        .into_owned()
}

/// Normalize a time like `4pm`, `4:30 PM` or `04:30pm` to `HH:MM AM|PM`.
pub fn normalize_time(raw: &str) -> String {
    let compact: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let Some(caps) = TIME_RE.captures(&compact) else {
        return raw.to_string();
    };

    let hour: u32 = caps[1].parse().unwrap_or(0);
    let minute: u32 = caps
        .get(2)
        .map_or(Some(0), |m| m.as_str().parse().ok())
        .unwrap_or(60);
    if !(1..=12).contains(&hour) || minute > 59 {
        return raw.to_string();
    }

    let meridiem = if &caps[3] == "am" { "AM" } else { "PM" };
    format!("{hour:02}:{minute:02} {meridiem}")
}

/// Normalize a natural-language date to `YYYY-MM-DD`, relative to `today`.
pub fn normalize_date(raw: &str, today: NaiveDate) -> String {
    parse_date(raw, today).map_or_else(
        || raw.to_string(),
        |date| date.format("%Y-%m-%d").to_string(),
    )
}

/// Best-effort natural-language date parser
pub fn parse_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return None;
    }

    if let Some(date) = parse_relative(&cleaned, today) {
        return Some(date);
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }

    for format in ["%Y-%m-%dt%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(dt.date());
        }
    }

    let with_year = format!("{cleaned} {}", today.year());
    for format in YEARLESS_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            return Some(date);
        }
    }

    None
}

/// Lowercase, drop commas and ordinal suffixes, collapse whitespace.
fn clean(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase().replace(',', " ");
    let lowered = ORDINAL_RE.replace_all(&lowered, "$1");
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_relative(cleaned: &str, today: NaiveDate) -> Option<NaiveDate> {
    match cleaned {
        "today" | "now" => return Some(today),
        "tomorrow" => return today.checked_add_days(Days::new(1)),
        "day after tomorrow" | "the day after tomorrow" => {
            return today.checked_add_days(Days::new(2))
        }
        "yesterday" => return today.checked_sub_days(Days::new(1)),
        _ => {}
    }

    if let Some(caps) = IN_DAYS_RE.captures(cleaned) {
        let (count, unit) = match (caps.get(1), caps.get(2)) {
            (Some(n), Some(u)) => (n.as_str(), u.as_str()),
            _ => (caps.get(3)?.as_str(), caps.get(4)?.as_str()),
        };
        let count: u64 = count.parse().ok()?;
        let days = if unit == "week" { count * 7 } else { count };
        return today.checked_add_days(Days::new(days));
    }

    let (strictly_after, day_name) = if let Some(rest) = cleaned.strip_prefix("next ") {
        (true, rest)
    } else if let Some(rest) = cleaned.strip_prefix("this ") {
        (false, rest)
    } else if let Some(rest) = cleaned.strip_prefix("on ") {
        (false, rest)
    } else {
        (false, cleaned)
    };

    let weekday: Weekday = day_name.parse().ok()?;
    let mut ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    if strictly_after && ahead == 0 {
        ahead = 7;
    }
    today.checked_add_days(Days::new(u64::from(ahead)))
}
