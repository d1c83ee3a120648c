//! Month grid for a date picker. Weeks start on Monday and use the same
//! weekday ordinal as [`DayMask`], so a cell is selectable exactly when the
//! mask allows its date and it is not in the past.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates::format_form_date;
use crate::day_mask::DayMask;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("month must be between 1 and 12 (got {0})")]
    InvalidMonth(u32),
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub day: Option<u32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<Vec<CalendarCell>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOption {
    pub name: &'static str,
    pub value: u32,
}

impl MonthGrid {
    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn format_selection(&self, day: u32) -> Option<String> {
        self.date(day).map(format_form_date)
    }

    pub fn active_days(&self) -> Vec<u32> {
        self.rows
            .iter()
            .flatten()
            .filter(|cell| cell.is_active)
            .filter_map(|cell| cell.day)
            .collect()
    }
}

fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .ok_or(CalendarError::InvalidYear(year))
}

pub fn month_grid(
    year: i32,
    month: u32,
    today: NaiveDate,
    mask: DayMask,
) -> Result<MonthGrid, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidYear(year))?;
    let last_day = days_in_month(year, month)?;
    let leading = first.weekday().num_days_from_monday() as usize;

    let mut cells: Vec<CalendarCell> = Vec::with_capacity(42);
    cells.extend((0..leading).map(|_| CalendarCell {
        day: None,
        is_active: false,
    }));
    for day in 1..=last_day {
        let is_active = NaiveDate::from_ymd_opt(year, month, day)
            .map(|date| date >= today && mask.is_allowed(date))
            .unwrap_or(false);
        cells.push(CalendarCell {
            day: Some(day),
            is_active,
        });
    }
    while cells.len() % 7 != 0 {
        cells.push(CalendarCell {
            day: None,
            is_active: false,
        });
    }

    let rows = cells.chunks(7).map(<[CalendarCell]>::to_vec).collect();
    Ok(MonthGrid { year, month, rows })
}

pub fn selectable_years(today: NaiveDate, years_ahead: u32) -> Vec<i32> {
    let current = today.year();
    (0..=years_ahead as i32).map(|offset| current + offset).collect()
}

/// Months that can still be picked in `year`, 1-based.
pub fn selectable_months(year: i32, today: NaiveDate) -> Vec<MonthOption> {
    let start = match year.cmp(&today.year()) {
        std::cmp::Ordering::Less => return Vec::new(),
        std::cmp::Ordering::Equal => today.month(),
        std::cmp::Ordering::Greater => 1,
    };
    (start..=12)
        .map(|value| MonthOption {
            name: MONTH_NAMES[(value - 1) as usize],
            value,
        })
        .collect()
}
