//! Time axis reconstruction.
//!
//! Stored time coordinates are integer tick counts relative to a reference
//! epoch: `timestamp = start + ticks * period_size` period units. Month and
//! year periods follow calendar arithmetic with day-of-month clamping
//! (Jan 31 + 1 month = Feb 28/29), everything shorter is a fixed duration.

use chrono::{DateTime, Duration, FixedOffset, Months};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Closed set of supported period units.
///
/// An unsupported unit is a configuration error at parameter-build time; it
/// can never surface mid-extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeriodUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeriodUnit::Millisecond => "millisecond",
            PeriodUnit::Second => "second",
            PeriodUnit::Minute => "minute",
            PeriodUnit::Hour => "hour",
            PeriodUnit::Day => "day",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
        };
        f.write_str(name)
    }
}

impl FromStr for PeriodUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "millisecond" | "milliseconds" | "ms" => Ok(PeriodUnit::Millisecond),
            "second" | "seconds" | "s" => Ok(PeriodUnit::Second),
            "minute" | "minutes" | "min" => Ok(PeriodUnit::Minute),
            "hour" | "hours" | "h" => Ok(PeriodUnit::Hour),
            "day" | "days" | "d" => Ok(PeriodUnit::Day),
            "month" | "months" => Ok(PeriodUnit::Month),
            "year" | "years" => Ok(PeriodUnit::Year),
            other => Err(Error::configuration(format!(
                "unsupported period unit: {other}"
            ))),
        }
    }
}

/// Convert a raw tick count into a calendar timestamp.
pub fn timestamp(
    ticks: i64,
    period_size: u32,
    period_unit: PeriodUnit,
    start: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>> {
    let count = ticks
        .checked_mul(period_size as i64)
        .ok_or(Error::TimeOverflow { ticks })?;

    let result = match period_unit {
        PeriodUnit::Millisecond => Duration::try_milliseconds(count)
            .and_then(|delta| start.checked_add_signed(delta)),
        PeriodUnit::Second => {
            Duration::try_seconds(count).and_then(|delta| start.checked_add_signed(delta))
        }
        PeriodUnit::Minute => {
            Duration::try_minutes(count).and_then(|delta| start.checked_add_signed(delta))
        }
        PeriodUnit::Hour => {
            Duration::try_hours(count).and_then(|delta| start.checked_add_signed(delta))
        }
        PeriodUnit::Day => {
            Duration::try_days(count).and_then(|delta| start.checked_add_signed(delta))
        }
        PeriodUnit::Month => add_months(start, count),
        PeriodUnit::Year => count.checked_mul(12).and_then(|months| add_months(start, months)),
    };

    result.ok_or(Error::TimeOverflow { ticks })
}

/// Signed month addition with day-of-month clamping.
fn add_months(start: DateTime<FixedOffset>, months: i64) -> Option<DateTime<FixedOffset>> {
    if months >= 0 {
        let months = u32::try_from(months).ok()?;
        start.checked_add_months(Months::new(months))
    } else {
        let months = u32::try_from(-months).ok()?;
        start.checked_sub_months(Months::new(months))
    }
}

/// Format a timestamp with a chrono pattern, e.g. `%Y-%m-%dT%H:%M:%S%:z`.
pub fn format_timestamp(value: DateTime<FixedOffset>, pattern: &str) -> String {
    value.format(pattern).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<FixedOffset> {
        "1970-01-01T00:00:00+00:00".parse().unwrap()
    }

    #[test]
    fn test_zero_ticks_is_start_for_all_units() {
        let units = [
            PeriodUnit::Millisecond,
            PeriodUnit::Second,
            PeriodUnit::Minute,
            PeriodUnit::Hour,
            PeriodUnit::Day,
            PeriodUnit::Month,
            PeriodUnit::Year,
        ];
        for unit in units {
            assert_eq!(timestamp(0, 12, unit, epoch()).unwrap(), epoch());
        }
    }

    #[test]
    fn test_second_ticks_accumulate() {
        let result = timestamp(90, 1, PeriodUnit::Second, epoch()).unwrap();
        assert_eq!(result, "1970-01-01T00:01:30+00:00".parse::<DateTime<FixedOffset>>().unwrap());
    }

    #[test]
    fn test_period_size_multiplies() {
        let result = timestamp(3, 6, PeriodUnit::Hour, epoch()).unwrap();
        assert_eq!(result, "1970-01-01T18:00:00+00:00".parse::<DateTime<FixedOffset>>().unwrap());
    }

    #[test]
    fn test_negative_ticks_go_backwards() {
        let result = timestamp(-1, 1, PeriodUnit::Day, epoch()).unwrap();
        assert_eq!(result, "1969-12-31T00:00:00+00:00".parse::<DateTime<FixedOffset>>().unwrap());
    }

    #[test]
    fn test_month_addition_clamps_day_of_month() {
        let start: DateTime<FixedOffset> = "2020-01-31T00:00:00+00:00".parse().unwrap();
        let result = timestamp(1, 1, PeriodUnit::Month, start).unwrap();
        // 2020 is a leap year.
        assert_eq!(result, "2020-02-29T00:00:00+00:00".parse::<DateTime<FixedOffset>>().unwrap());
    }

    #[test]
    fn test_year_unit_is_twelve_months() {
        let start: DateTime<FixedOffset> = "2000-02-29T12:00:00+00:00".parse().unwrap();
        let result = timestamp(1, 1, PeriodUnit::Year, start).unwrap();
        assert_eq!(result, "2001-02-28T12:00:00+00:00".parse::<DateTime<FixedOffset>>().unwrap());
    }

    #[test]
    fn test_overflow_is_reported() {
        assert!(matches!(
            timestamp(i64::MAX, 1000, PeriodUnit::Second, epoch()),
            Err(Error::TimeOverflow { .. })
        ));
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("second".parse::<PeriodUnit>().unwrap(), PeriodUnit::Second);
        assert_eq!("MS".parse::<PeriodUnit>().unwrap(), PeriodUnit::Millisecond);
        assert_eq!("months".parse::<PeriodUnit>().unwrap(), PeriodUnit::Month);
        assert!("fortnight".parse::<PeriodUnit>().is_err());
    }

    #[test]
    fn test_format_pattern() {
        let formatted = format_timestamp(epoch(), "%Y-%m-%d %H:%M");
        assert_eq!(formatted, "1970-01-01 00:00");
    }
}
