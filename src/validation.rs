use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::dates::parse_form_date;
use crate::day_mask::{short_name, DayMask};

/// Field-level failures. None of these are fatal; callers turn them into
/// messages next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("date must be a real calendar date in DD/MM/YYYY form (got {input:?})")]
    MalformedDate { input: String },

    #[error("{date} is a {}, which is not an allowed day", weekday_label(.weekday))]
    DisallowedDay { date: NaiveDate, weekday: Weekday },

    #[error("at least one allowed day must be selected")]
    EmptyAllowedSet,

    #[error("title is required")]
    TitleRequired,

    #[error("at least one category is required")]
    CategoryRequired,

    #[error("{field} must be a positive whole number (got {value:?})")]
    InvalidNumber { field: &'static str, value: String },

    #[error("repeat interval must be between 1 and 365 days (got {value})")]
    RepeatIntervalOutOfRange { value: i64 },

    #[error("{field} must be true or false (got {value:?})")]
    InvalidBoolean { field: &'static str, value: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedDate { .. } => "malformed_date",
            Self::DisallowedDay { .. } => "disallowed_day",
            Self::EmptyAllowedSet => "empty_allowed_set",
            Self::TitleRequired => "title_required",
            Self::CategoryRequired => "category_required",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::RepeatIntervalOutOfRange { .. } => "repeat_interval_out_of_range",
            Self::InvalidBoolean { .. } => "invalid_boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub error: ValidationError,
}

impl FieldError {
    pub fn new(field: &'static str, error: ValidationError) -> Self {
        Self { field, error }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldErrorView {
    pub field: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl From<&FieldError> for FieldErrorView {
    fn from(value: &FieldError) -> Self {
        Self {
            field: value.field,
            code: value.error.code(),
            message: value.error.to_string(),
        }
    }
}

/// Checks a `DD/MM/YYYY` candidate against a set of day names.
///
/// The date is parsed first, then the set must be non-empty, then the
/// weekday must be in it.
pub fn check_allowed_day<S: AsRef<str>>(
    date: &str,
    day_names: &[S],
) -> Result<NaiveDate, ValidationError> {
    let parsed = parse_form_date(date)?;
    let mask = DayMask::encode(day_names);
    check_mask(parsed, mask)?;
    Ok(parsed)
}

pub fn check_mask(date: NaiveDate, mask: DayMask) -> Result<(), ValidationError> {
    if mask.is_empty() {
        return Err(ValidationError::EmptyAllowedSet);
    }
    if !mask.is_allowed(date) {
        return Err(ValidationError::DisallowedDay {
            date,
            weekday: date.weekday(),
        });
    }
    Ok(())
}

fn weekday_label(day: &Weekday) -> &'static str {
    short_name(*day)
}

pub fn is_date_allowed<S: AsRef<str>>(date: &str, day_names: &[S]) -> bool {
    check_allowed_day(date, day_names).is_ok()
}
