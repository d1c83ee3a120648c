//! Date conversions at the edges: `DD/MM/YYYY` for form-style input, ISO-8601
//! for storage and output. Everything in between works on `NaiveDate`.

use chrono::{Days, Local, NaiveDate, NaiveDateTime};

use crate::validation::ValidationError;

pub const FORM_DATE_FORMAT: &str = "%d/%m/%Y";

pub fn parse_form_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let malformed = || ValidationError::MalformedDate {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    let mut parts = trimmed.split('/');
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    if day.len() != 2 || month.len() != 2 || year.len() != 4 {
        return Err(malformed());
    }
    if ![day, month, year]
        .iter()
        .all(|part| part.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(malformed());
    }
    let day: u32 = day.parse().map_err(|_| malformed())?;
    let month: u32 = month.parse().map_err(|_| malformed())?;
    let year: i32 = year.parse().map_err(|_| malformed())?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(malformed());
    }
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)
}

pub fn format_form_date(date: NaiveDate) -> String {
    date.format(FORM_DATE_FORMAT).to_string()
}

pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Accepts `2024-06-10T08:30:00`, with or without fractional seconds, and a
/// bare `2024-06-10` (read as midnight).
pub fn parse_iso_datetime(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(value);
    }
    parse_iso_date(trimmed).and_then(start_of_day)
}

pub fn format_iso_datetime(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn start_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn tomorrow(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

/// Resolves an optional `DD/MM/YYYY` override, defaulting to the local date.
pub fn resolve_today(input: Option<&str>) -> Result<NaiveDate, ValidationError> {
    match input.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_form_date(value),
        None => Ok(local_today()),
    }
}
