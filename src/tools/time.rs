//! `get_current_time_info` and `calculate_date_range`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::classify::{
    shift_days, weekday_name, DayBoundary, TimeRangeError, TimeWindow, DATE_FORMAT,
};

/// Arguments of `calculate_date_range`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DateRangeArgs {
    /// `today`, `yesterday`, `YYYY/MM/DD` or `YYYY-MM-DD`; defaults to today.
    pub base_date: Option<String>,
    pub start_offset_days: Option<i64>,
    pub end_offset_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentTimeInfo {
    pub success: bool,
    pub current_date: String,
    pub current_datetime: String,
    pub yesterday: String,
    pub tomorrow: String,
    pub one_week_later: String,
    pub one_month_later: String,
    pub three_months_later: String,
    pub weekday: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub success: bool,
    pub base_date: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub days_in_range: i64,
}

impl From<&TimeWindow> for DateRange {
    fn from(window: &TimeWindow) -> Self {
        Self {
            success: true,
            base_date: window.base_date.format(DATE_FORMAT).to_string(),
            start_date: window.start_date.format(DATE_FORMAT).to_string(),
            end_date: window.end_date.format(DATE_FORMAT).to_string(),
            description: window.description(),
            days_in_range: window.days_in_range,
        }
    }
}

fn fmt_offset(today: NaiveDate, days: i64) -> Result<String, TimeRangeError> {
    Ok(shift_days(today, days)?.format(DATE_FORMAT).to_string())
}

fn build_time_info(
    today: &DayBoundary,
    now: &DateTime<Utc>,
) -> Result<CurrentTimeInfo, TimeRangeError> {
    let date = today.date();
    let local_now = now.with_timezone(&today.tz());
    Ok(CurrentTimeInfo {
        success: true,
        current_date: date.format(DATE_FORMAT).to_string(),
        current_datetime: format!(
            "{} {}",
            date.format(DATE_FORMAT),
            local_now.format("%H:%M:%S")
        ),
        yesterday: fmt_offset(date, -1)?,
        tomorrow: fmt_offset(date, 1)?,
        one_week_later: fmt_offset(date, 7)?,
        one_month_later: fmt_offset(date, 30)?,
        three_months_later: fmt_offset(date, 90)?,
        weekday: weekday_name(date).to_string(),
        timezone: today.tz().name().to_string(),
    })
}

fn failure(tool: &str, err: &TimeRangeError) -> Value {
    serde_json::json!({
        "success": false,
        "error": err.to_string(),
        "function_name": tool,
    })
}

/// Today and common offsets from it. The date comes from `today`, the time
/// of day from `now`.
pub fn current_time_info(today: &DayBoundary, now: &DateTime<Utc>) -> Value {
    match build_time_info(today, now) {
        Ok(info) => serde_json::to_value(info).unwrap_or(Value::Null),
        Err(e) => failure("get_current_time_info", &e),
    }
}

/// The window `base_date + [start_offset_days, end_offset_days]`.
pub fn calculate_date_range(today: &DayBoundary, args: &DateRangeArgs) -> Value {
    let window = today
        .parse_base_date(args.base_date.as_deref().unwrap_or("today"))
        .and_then(|base| {
            TimeWindow::from_offsets(
                base,
                args.start_offset_days.unwrap_or(0),
                args.end_offset_days.unwrap_or(0),
            )
        });
    match window {
        Ok(window) => serde_json::to_value(DateRange::from(&window)).unwrap_or(Value::Null),
        Err(e) => failure("calculate_date_range", &e),
    }
}
