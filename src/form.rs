//! The create-task form as the client fills it in: raw strings, `DD/MM/YYYY`
//! dates and day names. [`CreateTaskForm::validate`] is the only place the
//! form shape turns into a [`CreateTaskDto`].

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates::{format_form_date, parse_form_date, tomorrow};
use crate::day_mask::{all_day_names, DayMask};
use crate::types::{CreateTaskDto, RestrictedDaysPolicy, TaskType};
use crate::validation::{check_mask, FieldError, ValidationError};

pub const MIN_REPEAT_INTERVAL: i64 = 1;
pub const MAX_REPEAT_INTERVAL: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ScheduleFor {
    #[default]
    Today,
    Tomorrow,
    Recurring,
}

impl ScheduleFor {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Some(ScheduleFor::Today),
            "tomorrow" => Some(ScheduleFor::Tomorrow),
            "recurring" => Some(ScheduleFor::Recurring),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ScheduleFor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ScheduleFor::parse(&raw).ok_or_else(|| {
            serde::de::Error::unknown_variant(&raw, &["Today", "Tomorrow", "Recurring"])
        })
    }
}

/// Clients send numeric and boolean fields either as typed JSON or as the
/// raw text of the input box.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldText {
    Number(serde_json::Number),
    Bool(bool),
    Text(String),
}

fn field_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match FieldText::deserialize(deserializer)? {
        FieldText::Number(number) => number.to_string(),
        FieldText::Bool(true) => "True".to_string(),
        FieldText::Bool(false) => "False".to_string(),
        FieldText::Text(text) => text,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTaskForm {
    pub title: String,
    pub category_ids: Vec<i64>,
    pub schedule_for: ScheduleFor,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(deserialize_with = "field_text")]
    pub difficulty: String,
    #[serde(deserialize_with = "field_text")]
    pub iteration_limit: String,
    #[serde(deserialize_with = "field_text")]
    pub is_optional: String,
    pub init_at: String,
    #[serde(deserialize_with = "field_text")]
    pub repeat_interval: String,
    pub allowed_days: Vec<String>,
    pub restricted_days_policy: RestrictedDaysPolicy,
}

impl Default for CreateTaskForm {
    fn default() -> Self {
        Self::new(crate::dates::local_today())
    }
}

impl CreateTaskForm {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            category_ids: Vec::new(),
            schedule_for: ScheduleFor::Today,
            task_type: TaskType::ToDo,
            difficulty: "1".to_string(),
            iteration_limit: "1".to_string(),
            is_optional: "False".to_string(),
            init_at: format_form_date(today),
            repeat_interval: "1".to_string(),
            allowed_days: all_day_names(),
            restricted_days_policy: RestrictedDaysPolicy::Before,
        }
    }

    /// Switching to a one-off schedule pins the date and resets the
    /// recurrence fields; `Recurring` leaves the date alone.
    pub fn apply_schedule_for(&mut self, choice: ScheduleFor, today: NaiveDate) {
        self.schedule_for = choice;
        match choice {
            ScheduleFor::Today => self.init_at = format_form_date(today),
            ScheduleFor::Tomorrow => self.init_at = format_form_date(tomorrow(today)),
            ScheduleFor::Recurring => {}
        }
        if choice != ScheduleFor::Recurring {
            self.repeat_interval = "1".to_string();
            self.allowed_days = all_day_names();
        }
    }

    pub fn validate(&self) -> Result<CreateTaskDto, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push(FieldError::new("title", ValidationError::TitleRequired));
        }
        if self.category_ids.is_empty() {
            errors.push(FieldError::new("categoryIds", ValidationError::CategoryRequired));
        }

        let difficulty = collect(&mut errors, "difficulty", parse_positive("difficulty", &self.difficulty));
        let iteration_limit = collect(
            &mut errors,
            "iterationLimit",
            parse_positive("iterationLimit", &self.iteration_limit),
        );
        let repeat_interval = collect(
            &mut errors,
            "repeatInterval",
            parse_repeat_interval(&self.repeat_interval),
        );
        let is_optional = collect(&mut errors, "isOptional", parse_bool("isOptional", &self.is_optional));

        let mask = DayMask::encode(&self.allowed_days);
        let init_at = match parse_form_date(&self.init_at) {
            Ok(date) => match check_mask(date, mask) {
                Ok(()) => Some(date),
                Err(err @ ValidationError::EmptyAllowedSet) => {
                    errors.push(FieldError::new("allowedDays", err));
                    None
                }
                Err(err) => {
                    errors.push(FieldError::new("initAt", err));
                    None
                }
            },
            Err(err) => {
                errors.push(FieldError::new("initAt", err));
                None
            }
        };

        match (difficulty, iteration_limit, repeat_interval, is_optional, init_at) {
            (Some(difficulty), Some(iteration_limit), Some(repeat_interval), Some(is_optional), Some(init_at))
                if errors.is_empty() =>
            {
                Ok(CreateTaskDto {
                    title: title.to_string(),
                    task_type: self.task_type,
                    is_optional,
                    is_recurring: self.schedule_for == ScheduleFor::Recurring,
                    difficulty,
                    iteration_limit,
                    init_at,
                    repeat_interval,
                    allowed_days: mask,
                    restricted_days_policy: self.restricted_days_policy,
                    category_ids: self.category_ids.clone(),
                })
            }
            _ => Err(errors),
        }
    }
}

fn collect<T>(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    result: Result<T, ValidationError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(FieldError::new(field, err));
            None
        }
    }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_repeat_interval(raw: &str) -> Result<i64, ValidationError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidNumber {
            field: "repeatInterval",
            value: raw.to_string(),
        })?;
    if !(MIN_REPEAT_INTERVAL..=MAX_REPEAT_INTERVAL).contains(&value) {
        return Err(ValidationError::RepeatIntervalOutOfRange { value });
    }
    Ok(value)
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ValidationError::InvalidBoolean {
            field,
            value: raw.to_string(),
        }),
    }
}
