use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::day_mask::DayMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    #[default]
    ToDo,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::ToDo => "TO_DO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TO_DO" | "TODO" => Some(TaskType::ToDo),
            _ => None,
        }
    }
}

/// Which way to move an activation that lands on a day outside the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictedDaysPolicy {
    #[default]
    Before,
    After,
}

impl RestrictedDaysPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RestrictedDaysPolicy::Before => "BEFORE",
            RestrictedDaysPolicy::After => "AFTER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Some(RestrictedDaysPolicy::Before),
            "AFTER" => Some(RestrictedDaysPolicy::After),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub is_optional: bool,
    pub is_recurring: bool,
    pub difficulty: i64,
    pub iteration_count: i64,
    pub iteration_limit: i64,
    pub current_score: f64,
    pub max_score: f64,
    pub init_at: NaiveDate,
    #[serde(default)]
    pub next_activation_at: Option<NaiveDateTime>,
    pub repeat_interval: i64,
    pub allowed_days: DayMask,
    #[serde(alias = "restricted_days_policy", default)]
    pub restricted_days_policy: RestrictedDaysPolicy,
    pub finished: bool,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Task {
    pub fn has_category(&self, category_id: i64) -> bool {
        self.categories.iter().any(|c| c.id == category_id)
    }
}

/// A validated create request. Dates are already ISO here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskDto {
    pub title: String,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    pub is_optional: bool,
    pub is_recurring: bool,
    pub difficulty: i64,
    pub iteration_limit: i64,
    pub init_at: NaiveDate,
    pub repeat_interval: i64,
    pub allowed_days: DayMask,
    #[serde(alias = "restricted_days_policy", default)]
    pub restricted_days_policy: RestrictedDaysPolicy,
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ListTasksOptions {
    pub include_finished: bool,
    pub category_id: Option<i64>,
    pub limit: Option<i64>,
}
