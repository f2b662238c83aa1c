//! CF calendars and time axes.
//!
//! Climate model output uses calendars that chrono cannot represent
//! (360-day years, years without leap days), so dates are kept as plain
//! `(year, month, day)` triples and every calendar supplies its own
//! day-number arithmetic.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

const CUMULATIVE_DAYS: [i64; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const CUMULATIVE_DAYS_LEAP: [i64; 13] =
    [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// The date-counting family of a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarKind {
    /// Real Gregorian calendar with leap years.
    Standard,
    /// Fixed 365-day years.
    NoLeap,
    /// Fixed 366-day years.
    AllLeap,
    /// Twelve 30-day months.
    Day360,
    /// Unknown calendar, counted like `Standard`.
    Other,
}

/// A calendar identifier as found on a `time` variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Calendar {
    kind: CalendarKind,
    name: String,
}

impl Calendar {
    /// Parse a CF calendar attribute (case-insensitive), keeping the original name.
    pub fn parse(name: &str) -> Self {
        let kind = match name.trim().to_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => CalendarKind::Standard,
            "365_day" | "noleap" => CalendarKind::NoLeap,
            "366_day" | "all_leap" => CalendarKind::AllLeap,
            "360_day" => CalendarKind::Day360,
            _ => CalendarKind::Other,
        };
        Self {
            kind,
            name: name.trim().to_string(),
        }
    }

    pub fn gregorian() -> Self {
        Self::parse("gregorian")
    }

    pub fn standard() -> Self {
        Self::parse("standard")
    }

    pub fn kind(&self) -> CalendarKind {
        self.kind
    }

    /// The calendar name as it should appear in a `calendar` attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of days in a month, or `None` for an invalid month.
    pub fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let m = month as usize;
        let days = match self.kind {
            CalendarKind::Day360 => 30,
            CalendarKind::NoLeap => CUMULATIVE_DAYS[m] - CUMULATIVE_DAYS[m - 1],
            CalendarKind::AllLeap => CUMULATIVE_DAYS_LEAP[m] - CUMULATIVE_DAYS_LEAP[m - 1],
            CalendarKind::Standard | CalendarKind::Other => {
                if is_gregorian_leap(year) {
                    CUMULATIVE_DAYS_LEAP[m] - CUMULATIVE_DAYS_LEAP[m - 1]
                } else {
                    CUMULATIVE_DAYS[m] - CUMULATIVE_DAYS[m - 1]
                }
            }
        };
        Some(days as u32)
    }

    /// Continuous day number of a date in this calendar.
    pub fn day_number(&self, date: &CalendarDate) -> i64 {
        let year = date.year as i64;
        let month = date.month as usize;
        let day = date.day as i64 - 1;
        match self.kind {
            CalendarKind::Day360 => year * 360 + (month as i64 - 1) * 30 + day,
            CalendarKind::NoLeap => year * 365 + CUMULATIVE_DAYS[month - 1] + day,
            CalendarKind::AllLeap => year * 366 + CUMULATIVE_DAYS_LEAP[month - 1] + day,
            CalendarKind::Standard | CalendarKind::Other => {
                // Dates are validated on construction, so this cannot fail.
                NaiveDate::from_ymd_opt(date.year, date.month, date.day)
                    .map(|d| d.num_days_from_ce() as i64)
                    .unwrap_or_default()
            }
        }
    }

    /// Inverse of [`Calendar::day_number`].
    pub fn date_from_day_number(&self, n: i64) -> CalendarDate {
        match self.kind {
            CalendarKind::Day360 => {
                let year = n.div_euclid(360);
                let rem = n.rem_euclid(360);
                CalendarDate {
                    year: year as i32,
                    month: (rem / 30) as u32 + 1,
                    day: (rem % 30) as u32 + 1,
                }
            }
            CalendarKind::NoLeap => split_fixed_year(n, 365, &CUMULATIVE_DAYS),
            CalendarKind::AllLeap => split_fixed_year(n, 366, &CUMULATIVE_DAYS_LEAP),
            CalendarKind::Standard | CalendarKind::Other => {
                let d = i32::try_from(n)
                    .ok()
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .unwrap_or(NaiveDate::MIN);
                CalendarDate {
                    year: d.year(),
                    month: d.month(),
                    day: d.day(),
                }
            }
        }
    }

    /// Signed number of days from `from` to `to`.
    pub fn days_between(&self, from: &CalendarDate, to: &CalendarDate) -> i64 {
        self.day_number(to) - self.day_number(from)
    }
}

impl std::fmt::Display for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn is_gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn split_fixed_year(n: i64, year_len: i64, cumulative: &[i64; 13]) -> CalendarDate {
    let year = n.div_euclid(year_len);
    let rem = n.rem_euclid(year_len);
    let month = cumulative.iter().rposition(|&c| c <= rem).unwrap_or(0);
    CalendarDate {
        year: year as i32,
        month: month as u32 + 1,
        day: (rem - cumulative[month]) as u32 + 1,
    }
}

/// A calendar-independent date.
///
/// Ordering is chronological within any single calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    /// Create a date that exists in the given calendar.
    pub fn new(year: i32, month: u32, day: u32, calendar: &Calendar) -> ClimateResult<Self> {
        match calendar.days_in_month(year, month) {
            Some(max_day) if day >= 1 && day <= max_day => Ok(Self { year, month, day }),
            _ => Err(ClimateError::InvalidDate {
                year,
                month,
                day,
                calendar: calendar.name().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// Length of one unit in days.
    pub fn in_days(&self) -> f64 {
        match self {
            Self::Days => 1.0,
            Self::Hours => 1.0 / 24.0,
            Self::Minutes => 1.0 / 1440.0,
            Self::Seconds => 1.0 / 86400.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "days" | "day" | "d" => Some(Self::Days),
            "hours" | "hour" | "h" | "hrs" => Some(Self::Hours),
            "minutes" | "minute" | "min" | "mins" => Some(Self::Minutes),
            "seconds" | "second" | "s" | "sec" | "secs" => Some(Self::Seconds),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }
}

/// Parsed CF time units, e.g. `days since 1950-01-01T00:00:00Z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub reference: CalendarDate,
    /// Time of day of the reference, as a fraction of a day.
    pub reference_day_fraction: f64,
}

impl TimeUnits {
    /// Parse a `<unit> since <date>[ T<time>][Z]` string.
    pub fn parse(units: &str) -> ClimateResult<Self> {
        let invalid = || ClimateError::InvalidTimeUnits(units.to_string());

        let (unit_part, ref_part) = units.split_once(" since ").ok_or_else(invalid)?;
        let unit = TimeUnit::parse(unit_part.trim()).ok_or_else(invalid)?;

        let ref_part = ref_part
            .trim()
            .trim_end_matches("UTC")
            .trim_end()
            .trim_end_matches('Z');
        let (date_part, time_part) = match ref_part.split_once(['T', ' ']) {
            Some((d, t)) => (d, Some(t.trim())),
            None => (ref_part, None),
        };

        let mut fields = date_part.split('-');
        let mut next_field = || -> ClimateResult<i64> {
            fields
                .next()
                .and_then(|f| f.trim().parse::<i64>().ok())
                .ok_or_else(invalid)
        };
        let year = next_field()?;
        let month = next_field()?;
        let day = next_field()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }

        let reference_day_fraction = match time_part.filter(|t| !t.is_empty()) {
            Some(t) => {
                let parts: Vec<f64> = t
                    .split(':')
                    .map(|p| p.trim().parse::<f64>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| invalid())?;
                let h = parts.first().copied().unwrap_or(0.0);
                let m = parts.get(1).copied().unwrap_or(0.0);
                let s = parts.get(2).copied().unwrap_or(0.0);
                (h * 3600.0 + m * 60.0 + s) / 86400.0
            }
            None => 0.0,
        };

        Ok(Self {
            unit,
            reference: CalendarDate {
                year: year as i32,
                month: month as u32,
                day: day as u32,
            },
            reference_day_fraction,
        })
    }

    /// Day-granular units anchored at midnight of `reference`.
    pub fn days_since(reference: CalendarDate) -> Self {
        Self {
            unit: TimeUnit::Days,
            reference,
            reference_day_fraction: 0.0,
        }
    }

    /// Decode one offset to the calendar day it falls on.
    pub fn decode(&self, value: f64, calendar: &Calendar) -> CalendarDate {
        let days = self.reference_day_fraction + value * self.unit.in_days();
        let n = calendar.day_number(&self.reference) + days.floor() as i64;
        calendar.date_from_day_number(n)
    }
}

impl std::fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = (self.reference_day_fraction * 86400.0).round() as u32;
        write!(
            f,
            "{} since {}T{:02}:{:02}:{:02}Z",
            self.unit.as_str(),
            self.reference,
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

/// A time coordinate: raw offsets, their units and calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    pub values: Vec<f64>,
    pub units: TimeUnits,
    pub calendar: Calendar,
}

impl TimeAxis {
    pub fn new(values: Vec<f64>, units: TimeUnits, calendar: Calendar) -> Self {
        Self {
            values,
            units,
            calendar,
        }
    }

    /// Consecutive daily steps starting at `start`.
    pub fn daily(start: CalendarDate, len: usize, calendar: Calendar) -> Self {
        let values = (0..len).map(|k| k as f64).collect();
        Self::new(values, TimeUnits::days_since(start), calendar)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode every step to its calendar date.
    pub fn dates(&self) -> Vec<CalendarDate> {
        self.values
            .iter()
            .map(|&v| self.units.decode(v, &self.calendar))
            .collect()
    }

    /// Calendar month (1-12) of every step.
    pub fn months(&self) -> Vec<u32> {
        self.dates().into_iter().map(|d| d.month).collect()
    }

    /// Keep only the steps at `indices`.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            values: indices.iter().map(|&i| self.values[i]).collect(),
            units: self.units.clone(),
            calendar: self.calendar.clone(),
        }
    }
}
