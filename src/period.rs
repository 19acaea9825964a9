//! Calendar period bucketing and development lag arithmetic
//!
//! Origin and registration dates are both mapped onto calendar periods of a
//! fixed periodicity. Lags are whole-period differences on the month grid,
//! then truncated to quarters or years.

use chrono::{Datelike, Months, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReservingError;

/// Calendar granularity of a triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Month,
    Quarter,
    Year,
}

impl Periodicity {
    /// Number of calendar months in one period
    pub fn months(&self) -> u32 {
        match self {
            Periodicity::Month => 1,
            Periodicity::Quarter => 3,
            Periodicity::Year => 12,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Periodicity::Month => "month",
            Periodicity::Quarter => "quarter",
            Periodicity::Year => "year",
        }
    }

    /// First calendar day of the period enclosing `date`
    pub fn bucket(&self, date: NaiveDate) -> NaiveDate {
        let month = match self {
            Periodicity::Month => date.month(),
            Periodicity::Quarter => (date.month() - 1) / 3 * 3 + 1,
            Periodicity::Year => 1,
        };
        // Day 1 of an existing year/month always exists
        NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
    }

    /// Whole periods elapsed between `origin` and `reference`, floored
    ///
    /// Negative when the reference month precedes the origin month; see
    /// [`Periodicity::development_lag`] for the clamped value.
    pub fn raw_lag(&self, origin: NaiveDate, reference: NaiveDate) -> i64 {
        let months = (reference.year() as i64 - origin.year() as i64) * 12
            + (reference.month() as i64 - origin.month() as i64);
        months.div_euclid(self.months() as i64)
    }

    /// Development lag clamped at zero
    pub fn development_lag(&self, origin: NaiveDate, reference: NaiveDate) -> u32 {
        self.raw_lag(origin, reference).max(0) as u32
    }
}

impl Default for Periodicity {
    fn default() -> Self {
        Periodicity::Month
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Periodicity {
    type Err = ReservingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "monthly" | "mes" => Ok(Periodicity::Month),
            "quarter" | "quarterly" | "trimestre" => Ok(Periodicity::Quarter),
            "year" | "yearly" | "annual" | "año" | "ano" => Ok(Periodicity::Year),
            other => Err(ReservingError::configuration(format!(
                "unsupported periodicity: {}",
                other
            ))),
        }
    }
}

/// Shift a period start back by whole months, saturating at the calendar minimum
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
