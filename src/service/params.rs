//! Parsing of request parameters as a request layer receives them: plain
//! optional strings.

use chrono::NaiveDate;
use crate::core::dates::parse_date;
use crate::core::error::{Error, Result};
use crate::core::types::Kind;
use crate::query::types::PresenceMode;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

pub fn parse_kind(value: &str) -> Result<Kind> {
    value.parse()
}

pub fn parse_day(value: &str) -> Result<NaiveDate> {
    parse_date(value)
}

pub fn parse_limit(value: Option<&str>) -> Result<usize> {
    let Some(value) = value else {
        return Ok(DEFAULT_LIMIT);
    };
    let out_of_range = || Error::invalid(format!("limit must be between 1 and {}", MAX_LIMIT));
    let limit: i64 = value.trim().parse().map_err(|_| out_of_range())?;
    if !(1..=MAX_LIMIT as i64).contains(&limit) {
        return Err(out_of_range());
    }
    Ok(limit as usize)
}

pub fn parse_presence(value: Option<&str>) -> Result<PresenceMode> {
    value.map_or(Ok(PresenceMode::Day), str::parse)
}

pub fn parse_bool(value: Option<&str>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::invalid(format!("Invalid boolean value: {}", value))),
    }
}
