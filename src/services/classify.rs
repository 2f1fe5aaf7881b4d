//! "Today" boundary, day windows and activity status classification.
//!
//! All comparisons are made on calendar dates in one fixed timezone, so the
//! outcome does not depend on the time of day a query runs.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::date_detection::local_midnight;

/// Display format for calendar dates.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Errors building a [`TimeWindow`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeRangeError {
    #[error("invalid base date '{0}': expected today, yesterday, YYYY/MM/DD or YYYY-MM-DD")]
    InvalidBaseDate(String),

    #[error("day offset {0} is out of range")]
    OffsetOutOfRange(i64),

    #[error("no local midnight exists for {0} in {1}")]
    NoLocalMidnight(NaiveDate, Tz),
}

/// Shift `date` by a signed number of days.
pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate, TimeRangeError> {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.ok_or(TimeRangeError::OffsetOutOfRange(days))
}

/// The calendar day every classification in one pass is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    date: NaiveDate,
    tz: Tz,
}

impl DayBoundary {
    /// Today in `tz`, from the wall clock.
    pub fn now(tz: Tz) -> Self {
        Self {
            date: Utc::now().with_timezone(&tz).date_naive(),
            tz,
        }
    }

    /// A frozen "today".
    pub fn fixed(date: NaiveDate, tz: Tz) -> Self {
        Self { date, tz }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Local midnight of `date` as a UTC instant.
    pub fn midnight_of(&self, date: NaiveDate) -> Result<DateTime<Utc>, TimeRangeError> {
        local_midnight(date, self.tz).ok_or(TimeRangeError::NoLocalMidnight(date, self.tz))
    }

    /// Today's local midnight as a UTC instant.
    pub fn midnight_utc(&self) -> Result<DateTime<Utc>, TimeRangeError> {
        self.midnight_of(self.date)
    }

    /// Calendar date of `instant` in this boundary's timezone.
    pub fn local_date_of(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Whole days from today to the local date of `instant`.
    pub fn days_until(&self, instant: &DateTime<Utc>) -> i64 {
        (self.local_date_of(instant) - self.date).num_days()
    }

    /// Resolve a base-date argument: `today`, `yesterday`, `YYYY/MM/DD` or `YYYY-MM-DD`.
    pub fn parse_base_date(&self, value: &str) -> Result<NaiveDate, TimeRangeError> {
        let value = value.trim();
        match value {
            "" | "today" => return Ok(self.date),
            "yesterday" => return shift_days(self.date, -1),
            _ => {}
        }
        ["%Y/%m/%d", "%Y-%m-%d"]
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
            .ok_or_else(|| TimeRangeError::InvalidBaseDate(value.to_string()))
    }
}

/// An inclusive range of calendar dates around a base date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub base_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count.
    pub days_in_range: i64,
    start_offset: i64,
    end_offset: i64,
}

impl TimeWindow {
    /// Window from day offsets relative to `base_date`. Offsets given out of
    /// order are swapped so that `start_date <= end_date`.
    pub fn from_offsets(
        base_date: NaiveDate,
        start_offset: i64,
        end_offset: i64,
    ) -> Result<Self, TimeRangeError> {
        let mut start_date = shift_days(base_date, start_offset)?;
        let mut end_date = shift_days(base_date, end_offset)?;
        if start_date > end_date {
            std::mem::swap(&mut start_date, &mut end_date);
        }
        Ok(Self {
            base_date,
            start_date,
            end_date,
            days_in_range: (end_date - start_date).num_days() + 1,
            start_offset,
            end_offset,
        })
    }

    /// Human-readable description, phrased from the offsets as given.
    pub fn description(&self) -> String {
        let (start, end) = (self.start_offset, self.end_offset);
        if start == 0 && end > 0 {
            format!("next {end} days from today")
        } else if start < 0 && end == 0 {
            format!("past {} days", start.unsigned_abs())
        } else if start < 0 && end > 0 {
            format!("past {} days to next {end} days", start.unsigned_abs())
        } else {
            format!(
                "{} to {}",
                self.start_date.format(DATE_FORMAT),
                self.end_date.format(DATE_FORMAT)
            )
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start_date..=self.end_date).contains(&date)
    }
}

/// Upper day bounds of the upcoming status bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub this_week_days: i64,
    pub this_month_days: i64,
    pub next_months_days: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            this_week_days: 7,
            this_month_days: 30,
            next_months_days: 90,
        }
    }
}

/// Where an activity's effective date falls relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Past,
    Today,
    ThisWeek,
    ThisMonth,
    NextMonths,
    Future,
    Unknown,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Past => "past",
            ActivityStatus::Today => "today",
            ActivityStatus::ThisWeek => "this_week",
            ActivityStatus::ThisMonth => "this_month",
            ActivityStatus::NextMonths => "next_months",
            ActivityStatus::Future => "future",
            ActivityStatus::Unknown => "unknown",
        }
    }

    pub fn is_upcoming(&self) -> bool {
        !matches!(self, ActivityStatus::Past | ActivityStatus::Unknown)
    }
}

/// Result of classifying one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: ActivityStatus,
    /// Signed day distance from today; `None` when there is no date.
    pub days_until: Option<i64>,
    pub label: String,
}

/// Classify an effective date against `today`.
pub fn classify(
    effective_date: Option<&DateTime<Utc>>,
    today: &DayBoundary,
    thresholds: &Thresholds,
) -> Classification {
    let Some(effective_date) = effective_date else {
        return Classification {
            status: ActivityStatus::Unknown,
            days_until: None,
            label: "Date unknown".to_string(),
        };
    };

    let days = today.days_until(effective_date);
    let (status, label) = if days < 0 {
        (ActivityStatus::Past, format!("Ended {} days ago", -days))
    } else if days == 0 {
        (ActivityStatus::Today, "Today".to_string())
    } else if days <= thresholds.this_week_days {
        (ActivityStatus::ThisWeek, format!("This week (in {days} days)"))
    } else if days <= thresholds.this_month_days {
        (ActivityStatus::ThisMonth, format!("This month (in {days} days)"))
    } else if days <= thresholds.next_months_days {
        (
            ActivityStatus::NextMonths,
            format!("Within {} days (in {days} days)", thresholds.next_months_days),
        )
    } else {
        (ActivityStatus::Future, format!("Upcoming (in {days} days)"))
    };

    Classification {
        status,
        days_until: Some(days),
        label,
    }
}

/// English weekday name.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Taipei;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> DayBoundary {
        DayBoundary::fixed(ymd(2026, 1, 15), Taipei)
    }

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Taipei
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_midnight_is_local() {
        assert_eq!(
            today().midnight_utc().unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 14, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_days_until_uses_local_calendar() {
        // 2026-01-14 17:00 UTC is already 01:00 on the 15th in Taipei.
        let instant = Utc.with_ymd_and_hms(2026, 1, 14, 17, 0, 0).unwrap();
        assert_eq!(today().days_until(&instant), 0);
        assert_eq!(today().days_until(&local(2026, 1, 14, 23)), -1);
    }

    #[test]
    fn test_classify_bands() {
        let t = today();
        let th = Thresholds::default();
        let status = |d: DateTime<Utc>| classify(Some(&d), &t, &th).status;

        assert_eq!(status(local(2026, 1, 12, 9)), ActivityStatus::Past);
        assert_eq!(status(local(2026, 1, 15, 0)), ActivityStatus::Today);
        assert_eq!(status(local(2026, 1, 15, 23)), ActivityStatus::Today);
        assert_eq!(status(local(2026, 1, 22, 0)), ActivityStatus::ThisWeek);
        assert_eq!(status(local(2026, 1, 23, 0)), ActivityStatus::ThisMonth);
        assert_eq!(status(local(2026, 2, 14, 0)), ActivityStatus::ThisMonth);
        assert_eq!(status(local(2026, 4, 15, 0)), ActivityStatus::NextMonths);
        assert_eq!(status(local(2026, 4, 16, 0)), ActivityStatus::Future);
    }

    #[test]
    fn test_classify_labels_and_distance() {
        let t = today();
        let th = Thresholds::default();

        let past = classify(Some(&local(2026, 1, 12, 9)), &t, &th);
        assert_eq!(past.days_until, Some(-3));
        assert_eq!(past.label, "Ended 3 days ago");

        let soon = classify(Some(&local(2026, 1, 20, 0)), &t, &th);
        assert_eq!(soon.days_until, Some(5));
        assert_eq!(soon.label, "This week (in 5 days)");
    }

    #[test]
    fn test_classify_without_date_is_unknown() {
        let c = classify(None, &today(), &Thresholds::default());
        assert_eq!(c.status, ActivityStatus::Unknown);
        assert_eq!(c.days_until, None);
        assert!(!c.status.is_upcoming());
    }

    #[test]
    fn test_window_swaps_out_of_order_offsets() {
        let w = TimeWindow::from_offsets(ymd(2026, 1, 15), 10, -5).unwrap();
        assert_eq!(w.start_date, ymd(2026, 1, 10));
        assert_eq!(w.end_date, ymd(2026, 1, 25));
        assert_eq!(w.days_in_range, 16);
    }

    #[test]
    fn test_window_descriptions() {
        let base = ymd(2026, 1, 15);
        let d = |s, e| TimeWindow::from_offsets(base, s, e).unwrap().description();
        assert_eq!(d(0, 90), "next 90 days from today");
        assert_eq!(d(-7, 0), "past 7 days");
        assert_eq!(d(-7, 14), "past 7 days to next 14 days");
        assert_eq!(d(3, 5), "2026/01/18 to 2026/01/20");
        assert_eq!(d(0, 0), "2026/01/15 to 2026/01/15");
    }

    #[test]
    fn test_window_single_day() {
        let w = TimeWindow::from_offsets(ymd(2026, 1, 15), 0, 0).unwrap();
        assert_eq!(w.days_in_range, 1);
        assert!(w.contains(ymd(2026, 1, 15)));
        assert!(!w.contains(ymd(2026, 1, 16)));
    }

    #[test]
    fn test_parse_base_date() {
        let t = today();
        assert_eq!(t.parse_base_date("today").unwrap(), ymd(2026, 1, 15));
        assert_eq!(t.parse_base_date("yesterday").unwrap(), ymd(2026, 1, 14));
        assert_eq!(t.parse_base_date("2026/02/01").unwrap(), ymd(2026, 2, 1));
        assert_eq!(t.parse_base_date("2026-02-01").unwrap(), ymd(2026, 2, 1));
        assert_eq!(
            t.parse_base_date("next tuesday"),
            Err(TimeRangeError::InvalidBaseDate("next tuesday".to_string()))
        );
    }

    #[test]
    fn test_offset_overflow_is_an_error() {
        assert!(TimeWindow::from_offsets(ymd(2026, 1, 15), 0, i64::MAX).is_err());
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(ymd(2026, 1, 15)), "Thursday");
    }
}
