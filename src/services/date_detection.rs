//! Date detection for activity posts.
//!
//! Event dates are pulled out of free text under several calendar notations
//! and then resolved against the post's publish date:
//! - Gregorian: `2026/01/27`, `2026-01-27`, `2026年1月27日`
//! - ROC (Minguo) full: `115年1月27日` (year + 1911)
//! - ROC slash: `115/01/27` (three-digit year segment)
//! - Bare month-day: `1月27日` (yearless)
//! - Month/day with weekday: `01/27(二)` (yearless)
//!
//! Extraction never fails: text without a recognizable date simply yields no
//! candidates.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::{Captures, Regex};
use tracing::debug;

/// Offset between ROC (Minguo) years and Gregorian years.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// Gregorian years accepted from explicit-year notations.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 2020..=2030;

/// Three-digit segments accepted as ROC years in slash notation.
const ROC_SLASH_YEARS: std::ops::RangeInclusive<i32> = 100..=200;

/// A yearless date further than this many days before the anchor is moved
/// into the following year.
pub const YEAR_ROLLOVER_DAYS: i64 = 60;

/// Calendar notation a date candidate was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notation {
    Iso,
    RocFull,
    RocSlash,
    BareMonthDay,
    MonthDayWeekday,
}

impl Notation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notation::Iso => "iso",
            Notation::RocFull => "roc_full",
            Notation::RocSlash => "roc_slash",
            Notation::BareMonthDay => "bare_month_day",
            Notation::MonthDayWeekday => "month_day_weekday",
        }
    }

    /// Whether the notation carries no year of its own.
    pub fn is_yearless(&self) -> bool {
        match self {
            Notation::Iso | Notation::RocFull | Notation::RocSlash => false,
            Notation::BareMonthDay | Notation::MonthDayWeekday => true,
        }
    }

    /// Rank used when several notations resolve to the same calendar date.
    /// Lower wins.
    fn priority(&self) -> u8 {
        match self {
            Notation::Iso => 0,
            Notation::RocFull => 1,
            Notation::RocSlash => 2,
            Notation::MonthDayWeekday => 3,
            Notation::BareMonthDay => 4,
        }
    }
}

/// The date part of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateDate {
    /// A complete, calendar-valid date.
    Full(NaiveDate),
    /// Month and day only; the year comes from the anchor.
    Yearless { month: u32, day: u32 },
}

/// A date-like substring found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateCandidate {
    pub date: CandidateDate,
    pub notation: Notation,
}

impl DateCandidate {
    fn full(year: i32, month: u32, day: u32, notation: Notation) -> Option<Self> {
        if !SUPPORTED_YEARS.contains(&year) {
            return None;
        }
        Self::calendar(year, month, day, notation)
    }

    /// A calendar-valid date without the Gregorian year band.
    fn calendar(year: i32, month: u32, day: u32, notation: Notation) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| Self {
            date: CandidateDate::Full(date),
            notation,
        })
    }

    fn yearless(month: u32, day: u32, notation: Notation) -> Option<Self> {
        // 2000 is a leap year, so Feb 29 passes here and is checked again
        // once the anchor year is known.
        NaiveDate::from_ymd_opt(2000, month, day)?;
        Some(Self {
            date: CandidateDate::Yearless { month, day },
            notation,
        })
    }

    /// Resolve to a concrete date using the anchor's year.
    ///
    /// Yearless dates more than [`YEAR_ROLLOVER_DAYS`] before the anchor move
    /// to the next year. Dates far after the anchor are kept as they are.
    /// Returns `None` when the date does not exist in the chosen year.
    pub fn resolve_year(&self, anchor: NaiveDateTime) -> Option<NaiveDate> {
        match self.date {
            CandidateDate::Full(date) => Some(date),
            CandidateDate::Yearless { month, day } => {
                let year = anchor.year();
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                let days_before = (anchor - date.and_hms_opt(0, 0, 0)?).num_days();
                if days_before > YEAR_ROLLOVER_DAYS {
                    NaiveDate::from_ymd_opt(year + 1, month, day)
                } else {
                    Some(date)
                }
            }
        }
    }
}

/// `YYYY/MM/DD` or `YYYY-MM-DD`; separators must match.
static GREGORIAN_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})([/-])([0-9]{1,2})([/-])([0-9]{1,2})").unwrap());

/// `YYYY年MM月DD日`
static GREGORIAN_CJK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})\s*年\s*([0-9]{1,2})\s*月\s*([0-9]{1,2})\s*日").unwrap()
});

/// `NNN年MM月DD日` (ROC year)
static ROC_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{2,3})\s*年\s*([0-9]{1,2})\s*月\s*([0-9]{1,2})\s*日").unwrap()
});

/// `NNN/MM/DD` (ROC year)
static ROC_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{3})/([0-9]{1,2})/([0-9]{1,2})").unwrap());

/// `MM月DD日`
static MONTH_DAY_CJK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})\s*月\s*([0-9]{1,2})\s*日").unwrap());

/// `MM/DD(三)` with ASCII or full-width parentheses.
static MONTH_DAY_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,2})/([0-9]{1,2})\s*[(（][一二三四五六日天][)）]").unwrap()
});

fn group<T: FromStr>(caps: &Captures, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

/// Character immediately before byte offset `start`.
fn char_before(text: &str, start: usize) -> Option<char> {
    text[..start].chars().next_back()
}

/// Last non-whitespace character before byte offset `start`.
fn visible_char_before(text: &str, start: usize) -> Option<char> {
    text[..start].chars().rev().find(|c| !c.is_whitespace())
}

fn char_after(text: &str, end: usize) -> Option<char> {
    text[end..].chars().next()
}

fn is_digit(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_ascii_digit())
}

/// Match spans that are not glued to surrounding digits.
fn digit_bounded<'t>(re: &'t Regex, text: &'t str) -> impl Iterator<Item = Captures<'t>> {
    re.captures_iter(text).filter(move |caps| {
        let Some(whole) = caps.get(0) else {
            return false;
        };
        !is_digit(char_before(text, whole.start())) && !is_digit(char_after(text, whole.end()))
    })
}

/// Scan text for date candidates under every supported notation.
///
/// Notations are matched independently, so the same substring may produce
/// candidates under more than one of them. Calendar-invalid dates are dropped.
pub fn extract_candidates(text: &str) -> Vec<DateCandidate> {
    let mut out = Vec::new();

    for caps in digit_bounded(&GREGORIAN_NUMERIC, text) {
        if caps.get(2).map(|m| m.as_str()) != caps.get(4).map(|m| m.as_str()) {
            continue;
        }
        let parsed = (group(&caps, 1), group(&caps, 3), group(&caps, 5));
        if let (Some(y), Some(m), Some(d)) = parsed {
            out.extend(DateCandidate::full(y, m, d, Notation::Iso));
        }
    }

    for caps in GREGORIAN_CJK.captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        if is_digit(char_before(text, start)) {
            continue;
        }
        let parsed = (group(&caps, 1), group(&caps, 2), group(&caps, 3));
        if let (Some(y), Some(m), Some(d)) = parsed {
            out.extend(DateCandidate::full(y, m, d, Notation::Iso));
        }
    }

    for caps in ROC_FULL.captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        if is_digit(char_before(text, start)) {
            continue;
        }
        let parsed = (group::<i32>(&caps, 1), group(&caps, 2), group(&caps, 3));
        if let (Some(y), Some(m), Some(d)) = parsed {
            out.extend(DateCandidate::full(y + ROC_YEAR_OFFSET, m, d, Notation::RocFull));
        }
    }

    for caps in digit_bounded(&ROC_SLASH, text) {
        let parsed = (group::<i32>(&caps, 1), group(&caps, 2), group(&caps, 3));
        if let (Some(y), Some(m), Some(d)) = parsed {
            // The three-digit band is the only year check for this notation.
            if ROC_SLASH_YEARS.contains(&y) {
                out.extend(DateCandidate::calendar(
                    y + ROC_YEAR_OFFSET,
                    m,
                    d,
                    Notation::RocSlash,
                ));
            }
        }
    }

    for caps in MONTH_DAY_CJK.captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        // Skip the month-day tail of a dated expression like 115年1月27日.
        if is_digit(char_before(text, start)) || visible_char_before(text, start) == Some('年') {
            continue;
        }
        if let (Some(m), Some(d)) = (group(&caps, 1), group(&caps, 2)) {
            out.extend(DateCandidate::yearless(m, d, Notation::BareMonthDay));
        }
    }

    for caps in MONTH_DAY_WEEKDAY.captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        // Skip the tail of 2026/02/11(三) or 115/02/11(三).
        if matches!(char_before(text, start), Some(c) if c.is_ascii_digit() || c == '/') {
            continue;
        }
        if let (Some(m), Some(d)) = (group(&caps, 1), group(&caps, 2)) {
            out.extend(DateCandidate::yearless(m, d, Notation::MonthDayWeekday));
        }
    }

    out
}

/// Outcome of resolving a candidate set against an anchor.
///
/// `event_date` is the only result callers act on; the counters are a
/// diagnostic channel for logging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateResolution {
    /// The canonical event date, if any candidate survived.
    pub event_date: Option<NaiveDate>,
    /// Notation of the chosen candidate.
    pub notation: Option<Notation>,
    /// Candidates handed in.
    pub candidates: usize,
    /// Distinct calendar dates after year assignment.
    pub distinct: usize,
    /// Yearless candidates whose date does not exist in the assigned year.
    pub discarded: usize,
}

/// Resolve candidates to at most one canonical date.
///
/// Yearless candidates take the anchor's year (see
/// [`DateCandidate::resolve_year`]); identical dates collapse to one. The
/// earliest date on or after the anchor's calendar day wins; if every date is
/// earlier, the globally earliest one is returned.
pub fn resolve_event_date(candidates: &[DateCandidate], anchor: NaiveDateTime) -> DateResolution {
    let mut dates: BTreeMap<NaiveDate, Notation> = BTreeMap::new();
    let mut discarded = 0;

    for candidate in candidates {
        let Some(date) = candidate.resolve_year(anchor) else {
            discarded += 1;
            continue;
        };
        dates
            .entry(date)
            .and_modify(|existing| {
                if candidate.notation.priority() < existing.priority() {
                    *existing = candidate.notation;
                }
            })
            .or_insert(candidate.notation);
    }

    let chosen = dates
        .range(anchor.date()..)
        .next()
        .or_else(|| dates.iter().next())
        .map(|(date, notation)| (*date, *notation));

    if dates.len() > 1 {
        debug!(
            candidates = dates.len(),
            chosen = ?chosen.map(|(d, _)| d),
            "resolved ambiguous event date"
        );
    }

    DateResolution {
        event_date: chosen.map(|(d, _)| d),
        notation: chosen.map(|(_, n)| n),
        candidates: candidates.len(),
        distinct: dates.len(),
        discarded,
    }
}

/// Extract and resolve the event date of a post body.
pub fn detect_event_date(text: &str, anchor: DateTime<Tz>) -> DateResolution {
    let candidates = extract_candidates(text);
    if candidates.is_empty() {
        debug!("no date candidates in text");
        return DateResolution::default();
    }
    resolve_event_date(&candidates, anchor.naive_local())
}

/// Local midnight of `date` in `tz`, as UTC.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse an ISO-8601-ish timestamp.
///
/// Values with an offset keep it; naive values are read as local time in
/// `tz`; date-only values become local midnight.
pub fn parse_timestamp(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return local_midnight(date, tz);
        }
    }

    None
}
