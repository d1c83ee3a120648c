//! Groups tasks by how soon their next activation falls.
//!
//! Offsets are whole calendar days from `today`. Time of day is dropped, so
//! an activation at exactly midnight belongs to that day. Overdue tasks are
//! folded into `Today`; tasks without an activation are reported in
//! [`BucketReport::skipped`].

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::types::{Category, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeRange {
    #[serde(rename = "TODAY")]
    Today,
    #[serde(rename = "TOMORROW")]
    Tomorrow,
    #[serde(rename = "NEXT_7_DAYS")]
    Next7Days,
    #[serde(rename = "NEXT_30_DAYS")]
    Next30Days,
    #[serde(rename = "NOT_SOON")]
    NotSoon,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::Today,
        TimeRange::Tomorrow,
        TimeRange::Next7Days,
        TimeRange::Next30Days,
        TimeRange::NotSoon,
    ];

    /// First day offset covered by the range and how many days it spans.
    /// `NotSoon` is open-ended.
    pub fn window(self) -> (i64, Option<i64>) {
        match self {
            TimeRange::Today => (0, Some(1)),
            TimeRange::Tomorrow => (1, Some(1)),
            TimeRange::Next7Days => (2, Some(5)),
            TimeRange::Next30Days => (7, Some(23)),
            TimeRange::NotSoon => (30, None),
        }
    }

    pub fn for_offset(offset: i64) -> TimeRange {
        if offset < 0 {
            return TimeRange::Today;
        }
        Self::ALL
            .into_iter()
            .find(|range| match range.window() {
                (start, Some(span)) => offset >= start && offset < start + span,
                (start, None) => offset >= start,
            })
            .unwrap_or(TimeRange::NotSoon)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::Today => "Today",
            TimeRange::Tomorrow => "Tomorrow",
            TimeRange::Next7Days => "Next 7 days",
            TimeRange::Next30Days => "Next 30 days",
            TimeRange::NotSoon => "Not soon",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRangeBucket<'a> {
    pub range: TimeRange,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    MissingActivationDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTask<'a> {
    pub reason: SkipReason,
    pub task: &'a Task,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketReport<'a> {
    pub buckets: Vec<TimeRangeBucket<'a>>,
    pub skipped: Vec<SkippedTask<'a>>,
}

impl<'a> BucketReport<'a> {
    pub fn bucket(&self, range: TimeRange) -> &[&'a Task] {
        self.buckets
            .iter()
            .find(|bucket| bucket.range == range)
            .map(|bucket| bucket.tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn bucketed_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.tasks.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedTasks<'a> {
    pub category: &'a Category,
    pub tasks: Vec<&'a Task>,
}

pub fn day_offset(task: &Task, today: NaiveDate) -> Option<i64> {
    task.next_activation_at
        .map(|at| at.date().signed_duration_since(today).num_days())
}

pub fn time_range_of(task: &Task, today: NaiveDate) -> Option<TimeRange> {
    day_offset(task, today).map(TimeRange::for_offset)
}

pub fn bucket_tasks(tasks: &[Task], today: NaiveDate) -> BucketReport<'_> {
    let mut buckets: Vec<TimeRangeBucket<'_>> = TimeRange::ALL
        .into_iter()
        .map(|range| TimeRangeBucket {
            range,
            tasks: Vec::new(),
        })
        .collect();
    let mut skipped = Vec::new();

    for task in tasks {
        match time_range_of(task, today) {
            Some(range) => {
                if let Some(bucket) = buckets.iter_mut().find(|b| b.range == range) {
                    bucket.tasks.push(task);
                }
            }
            None => skipped.push(SkippedTask {
                reason: SkipReason::MissingActivationDate,
                task,
            }),
        }
    }

    if !skipped.is_empty() {
        tracing::debug!(
            skipped = skipped.len(),
            "tasks without an activation date left out of buckets"
        );
    }
    BucketReport { buckets, skipped }
}

/// Today's tasks grouped per category, categories in first-seen order. A
/// task with several categories is listed under each of them.
pub fn daily_categorized_tasks(tasks: &[Task], today: NaiveDate) -> Vec<CategorizedTasks<'_>> {
    let mut result: Vec<CategorizedTasks<'_>> = Vec::new();
    let due_today = tasks
        .iter()
        .filter(|task| time_range_of(task, today) == Some(TimeRange::Today));
    for task in due_today {
        for category in &task.categories {
            match result.iter_mut().find(|group| group.category.id == category.id) {
                Some(group) => {
                    if !group.tasks.iter().any(|t| std::ptr::eq(*t, task)) {
                        group.tasks.push(task);
                    }
                }
                None => result.push(CategorizedTasks {
                    category,
                    tasks: vec![task],
                }),
            }
        }
    }
    result
}
