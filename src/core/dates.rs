use chrono::{Datelike, NaiveDate};
use crate::core::error::{Error, Result};

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::invalid(format!("Invalid date format: {}", value)))
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Days since 0001-01-01, the on-disk date representation.
pub fn to_day_number(date: NaiveDate) -> u32 {
    date.num_days_from_ce() as u32
}

pub fn from_day_number(days: u32) -> Result<NaiveDate> {
    i32::try_from(days)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| Error::corrupt(format!("Day number out of range: {}", days)))
}

/// Closed date interval. Construction enforces `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::invalid(format!(
                "start must not be after end ({} > {})",
                iso_date(start),
                iso_date(end)
            )));
        }
        Ok(DateRange { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        DateRange { start: date, end: date }
    }

    /// Everything strictly before `date`.
    pub fn before(date: NaiveDate) -> Option<Self> {
        date.pred_opt().map(|end| DateRange { start: NaiveDate::MIN, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }
}
