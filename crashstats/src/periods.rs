//! Date ranges and fixed-width periods for slice-by-slice facet queries.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use regex::Regex;

use crate::error::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const POINT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static RELATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([hdw])$").expect("relative date pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
}

impl Granularity {
    pub fn step(self) -> TimeDelta {
        match self {
            Granularity::Hourly => TimeDelta::hours(1),
            Granularity::Daily => TimeDelta::days(1),
            Granularity::Weekly => TimeDelta::weeks(1),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
        };
        f.write_str(name)
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Granularity::Hourly),
            "daily" => Ok(Granularity::Daily),
            "weekly" => Ok(Granularity::Weekly),
            other => Err(Error::InvalidArgument(format!("unknown period: {}", other))),
        }
    }
}

/// Half-open `(start, end)` intervals stepping from `start` while the period
/// start is on or before `end`.
///
/// Always yields at least one interval when `start <= end`; the last interval
/// may run past `end`.
#[derive(Debug, Clone)]
pub struct Periods {
    next: Option<NaiveDateTime>,
    end: NaiveDateTime,
    step: TimeDelta,
}

impl Periods {
    pub fn new(granularity: Granularity, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            next: Some(start),
            end,
            step: granularity.step(),
        }
    }

    /// Periods between two `YYYY-MM-DD` dates.
    pub fn between(granularity: Granularity, start: &str, end: &str) -> Result<Self> {
        let start = parse_date(start)?.and_time(chrono::NaiveTime::MIN);
        let end = parse_date(end)?.and_time(chrono::NaiveTime::MIN);
        Ok(Self::new(granularity, start, end))
    }
}

impl Iterator for Periods {
    type Item = (NaiveDateTime, NaiveDateTime);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next.take()?;
        if start > self.end {
            return None;
        }
        let stop = start.checked_add_signed(self.step)?;
        self.next = Some(stop);
        Some((start, stop))
    }
}

pub fn format_period_point(point: &NaiveDateTime) -> String {
    point.format(POINT_FORMAT).to_string()
}

/// `7d` → 7 days. Units: `h`ours, `d`ays, `w`eeks.
pub fn parse_relative_date(text: &str) -> Result<TimeDelta> {
    let captures = RELATIVE_RE.captures(text.trim()).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "{:?} is not a valid relative range; use a number and h, d, or w (e.g. 7d)",
            text
        ))
    })?;

    let out_of_range = || Error::InvalidArgument(format!("{:?} is out of range", text));
    let count: i64 = captures[1].parse().map_err(|_| out_of_range())?;
    let delta = match &captures[2] {
        "h" => TimeDelta::try_hours(count),
        "d" => TimeDelta::try_days(count),
        _ => TimeDelta::try_weeks(count),
    };
    delta.ok_or_else(out_of_range)
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| {
        Error::InvalidArgument(format!("{:?} is not a YYYY-MM-DD date: {}", text, e))
    })
}

/// Resolved `[start, end]` dates as `YYYY-MM-DD` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    /// `date` filter values for the whole range.
    pub fn date_params(&self) -> Vec<String> {
        vec![format!(">={}", self.start), format!("<{}", self.end)]
    }
}

/// End defaults to `today`; start defaults to `end - relative`.
pub fn resolve_date_range(
    start: Option<&str>,
    end: Option<&str>,
    relative: &str,
    today: NaiveDate,
) -> Result<DateRange> {
    let end = match end.filter(|e| !e.is_empty()) {
        Some(end) => parse_date(end)?,
        None => today,
    };
    let start = match start.filter(|s| !s.is_empty()) {
        Some(start) => parse_date(start)?,
        None => {
            let delta = parse_relative_date(relative)?;
            end.and_time(chrono::NaiveTime::MIN)
                .checked_sub_signed(delta)
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("{:?} reaches past the earliest date", relative))
                })?
                .date()
        }
    };

    Ok(DateRange {
        start: start.format(DATE_FORMAT).to_string(),
        end: end.format(DATE_FORMAT).to_string(),
    })
}

/// `date` filter values for one period.
pub fn period_date_params(start: &NaiveDateTime, end: &NaiveDateTime) -> Vec<String> {
    vec![
        format!(">={}", format_period_point(start)),
        format!("<{}", format_period_point(end)),
    ]
}
