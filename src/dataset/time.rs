//! CF-convention time axis decoding.
//!
//! Parses `units` attributes of the form `<unit> since <date>[ <time>]` and
//! converts raw axis values to timestamps on the proleptic Gregorian calendar.

use crate::constants::SUPPORTED_CALENDARS;
use crate::error::{ExtractError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;

const CF_UNITS_PATTERN: &str = r"(?i)^\s*(days?|d|hours?|hrs?|h|minutes?|mins?|seconds?|secs?|s)\s+since\s+(\d{1,4}-\d{1,2}-\d{1,2})(?:[T\s]+(\d{1,2}:\d{1,2}(?::\d{1,2}(?:\.\d+)?)?))?";

/// Unit of a CF time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    fn milliseconds(&self) -> f64 {
        match self {
            TimeUnit::Days => 86_400_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Seconds => 1_000.0,
        }
    }

    fn parse(unit: &str) -> Option<Self> {
        match unit.to_lowercase().as_str() {
            "day" | "days" | "d" => Some(TimeUnit::Days),
            "hour" | "hours" | "hr" | "hrs" | "h" => Some(TimeUnit::Hours),
            "minute" | "minutes" | "min" | "mins" => Some(TimeUnit::Minutes),
            "second" | "seconds" | "sec" | "secs" | "s" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }
}

/// Parsed `units` (and calendar) of a time coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a CF `units` string, rejecting calendars that are not Gregorian
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self> {
        if let Some(calendar) = calendar {
            let calendar = calendar.trim().to_lowercase();
            if !SUPPORTED_CALENDARS.contains(&calendar.as_str()) {
                return Err(ExtractError::configuration(format!(
                    "unsupported time calendar '{}'",
                    calendar
                )));
            }
        }

        let pattern = Regex::new(CF_UNITS_PATTERN)
            .map_err(|e| ExtractError::configuration(format!("invalid units pattern: {}", e)))?;

        let captures = pattern.captures(units).ok_or_else(|| {
            ExtractError::configuration(format!("unrecognised time units '{}'", units))
        })?;

        let unit = TimeUnit::parse(&captures[1]).ok_or_else(|| {
            ExtractError::configuration(format!("unrecognised time unit '{}'", &captures[1]))
        })?;

        let date = NaiveDate::parse_from_str(&captures[2], "%Y-%m-%d").map_err(|e| {
            ExtractError::configuration(format!("invalid reference date in '{}': {}", units, e))
        })?;

        let time = match captures.get(3) {
            Some(m) => parse_reference_time(m.as_str()).ok_or_else(|| {
                ExtractError::configuration(format!("invalid reference time in '{}'", units))
            })?,
            None => NaiveTime::MIN,
        };

        Ok(Self {
            unit,
            epoch: date.and_time(time),
        })
    }

    /// Convert one raw axis value to a timestamp
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime> {
        let millis = value * self.unit.milliseconds();
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return Err(ExtractError::configuration(format!(
                "time value {} cannot be decoded",
                value
            )));
        }

        TimeDelta::try_milliseconds(millis.round() as i64)
            .and_then(|delta| self.epoch.checked_add_signed(delta))
            .ok_or_else(|| {
                ExtractError::configuration(format!("time value {} is out of range", value))
            })
    }

    /// Decode a whole time axis
    pub fn decode_axis(&self, values: &[f64]) -> Result<Vec<NaiveDateTime>> {
        values.iter().map(|v| self.decode(*v)).collect()
    }
}

fn parse_reference_time(text: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}
