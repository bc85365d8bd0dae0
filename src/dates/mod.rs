//! Free-form posting date normalization.
//!
//! Marketplaces publish dates in whatever phrasing they like: relative
//! English or Swedish phrases ("2 days ago", "Igår"), ISO dates, day and
//! month names with or without a year, and numeric day/month/year forms.
//!
//! Recognition runs an ordered table of independent matchers. The first
//! matcher that produces a valid calendar value wins; later matchers are
//! never consulted, even if they would also match.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A posting date resolved to local wall-clock time, or the sentinel for
/// text that no matcher recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NormalizedDate {
    At(NaiveDateTime),
    Unparseable,
}

impl NormalizedDate {
    pub fn instant(self) -> Option<NaiveDateTime> {
        match self {
            Self::At(at) => Some(at),
            Self::Unparseable => None,
        }
    }

    pub fn is_parseable(self) -> bool {
        matches!(self, Self::At(_))
    }
}

type Matcher = fn(&str, NaiveDateTime) -> Option<NaiveDateTime>;

/// Pattern families in priority order.
const MATCHERS: &[(&str, Matcher)] = &[
    ("immediate", match_immediate),
    ("calendar-day", match_calendar_day),
    ("relative-offset", match_relative_offset),
    ("iso", match_iso),
    ("day-month", match_month_name),
    ("numeric", match_numeric),
];

static NOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:just now|right now|now|nu|nyss)\b").unwrap());
static TODAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:idag|i dag|today)\b").unwrap());
static YESTERDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:igår|i går|yesterday)\b").unwrap());
static DAYS_AGO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+(?:days?|dagar|dag)\s+(?:ago|sedan)\b").unwrap());
static HOURS_AGO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:hours?|timmar|timme)\s+(?:ago|sedan)\b").unwrap()
});
static WEEKS_AGO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:weeks?|veckor|vecka)\s+(?:ago|sedan)\b").unwrap()
});
static ISO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());

/// Month names accepted by the name-based matchers: the three letter
/// abbreviations plus the full Swedish and English spellings.
const MONTH_NAME: &str = r"(?:jan(?:uari|uary)?|feb(?:ruari|ruary)?|mar(?:s|ch)?|apr(?:il)?|ma[jy]|jun(?:i|e)?|jul(?:i|y)?|aug(?:usti|ust)?|sep(?:t|tember)?|okt(?:ober)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b";

static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s+({MONTH_NAME})\.?(?:\s*,?\s*(\d{{4}})\b)?"
    ))
    .unwrap()
});
static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH_NAME})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:\s*,?\s*(\d{{4}})\b)?"
    ))
    .unwrap()
});
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").unwrap());

const SWEDISH_MONTHS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("maj", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("okt", 10),
    ("nov", 11),
    ("dec", 12),
];

const ENGLISH_MONTHS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Normalize a raw date phrase against the current local time.
pub fn normalize(raw: &str) -> NormalizedDate {
    normalize_at(raw, Local::now().naive_local())
}

/// Normalize a raw date phrase relative to `now`.
pub fn normalize_at(raw: &str, now: NaiveDateTime) -> NormalizedDate {
    let text = raw.trim();
    if text.is_empty() {
        return NormalizedDate::Unparseable;
    }

    for (family, matcher) in MATCHERS {
        if let Some(at) = matcher(text, now) {
            tracing::trace!(family, raw = text, %at, "date matched");
            return NormalizedDate::At(at);
        }
    }

    NormalizedDate::Unparseable
}

/// Absent date text is treated the same as unparseable text.
pub fn normalize_optional(raw: Option<&str>, now: NaiveDateTime) -> NormalizedDate {
    raw.map_or(NormalizedDate::Unparseable, |text| normalize_at(text, now))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn match_immediate(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    NOW_RE.is_match(text).then_some(now)
}

fn match_calendar_day(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if TODAY_RE.is_match(text) {
        return Some(midnight(now.date()));
    }
    if YESTERDAY_RE.is_match(text) {
        return now.date().pred_opt().map(midnight);
    }
    None
}

fn match_relative_offset(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if let Some(days) = leading_count(&DAYS_AGO_RE, text) {
        return now
            .checked_sub_signed(Duration::days(days))
            .map(|at| midnight(at.date()));
    }
    if let Some(hours) = leading_count(&HOURS_AGO_RE, text) {
        return now.checked_sub_signed(Duration::hours(hours));
    }
    if let Some(weeks) = leading_count(&WEEKS_AGO_RE, text) {
        return now
            .checked_sub_signed(Duration::days(weeks * 7))
            .map(|at| midnight(at.date()));
    }
    None
}

fn leading_count(re: &Regex, text: &str) -> Option<i64> {
    let caps = re.captures(text)?;
    caps[1].parse::<u32>().ok().map(i64::from)
}

fn match_iso(text: &str, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    ISO_RE.captures_iter(text).find_map(|caps| {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(midnight)
    })
}

fn match_month_name(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let day_first = DAY_MONTH_RE.captures_iter(text).find_map(|caps| {
        let day = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
        resolve_day_month(day, month, year, now)
    });

    day_first.or_else(|| {
        MONTH_DAY_RE.captures_iter(text).find_map(|caps| {
            let month = month_number(&caps[1])?;
            let day = caps[2].parse().ok()?;
            let year = caps.get(3).and_then(|y| y.as_str().parse().ok());
            resolve_day_month(day, month, year, now)
        })
    })
}

fn month_number(name: &str) -> Option<u32> {
    let key: String = name.chars().take(3).collect::<String>().to_lowercase();
    SWEDISH_MONTHS
        .iter()
        .chain(ENGLISH_MONTHS.iter())
        .find(|(abbr, _)| *abbr == key)
        .map(|(_, month)| *month)
}

/// Without an explicit year the current year is assumed, unless that would
/// place the date after `now`, in which case the previous year is used.
fn resolve_day_month(
    day: u32,
    month: u32,
    year: Option<i32>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day).map(midnight);
    }

    let this_year = NaiveDate::from_ymd_opt(now.year(), month, day).map(midnight)?;
    if this_year > now {
        NaiveDate::from_ymd_opt(now.year() - 1, month, day).map(midnight)
    } else {
        Some(this_year)
    }
}

fn match_numeric(text: &str, _now: NaiveDateTime) -> Option<NaiveDateTime> {
    NUMERIC_RE.captures_iter(text).find_map(|caps| {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        NaiveDate::from_ymd_opt(year, month, day).map(midnight)
    })
}
