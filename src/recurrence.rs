use chrono::{Days, NaiveDate};

use crate::dates::start_of_day;
use crate::day_mask::DayMask;
use crate::types::{RestrictedDaysPolicy, Task};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("task {id} is already finished")]
    AlreadyFinished { id: String },
    #[error("task {id} has no allowed days to recur on")]
    EmptyAllowedSet { id: String },
    #[error("activation date out of range")]
    OutOfRange,
}

fn forward_to_allowed(from: NaiveDate, mask: DayMask) -> Option<NaiveDate> {
    (0..7u64)
        .filter_map(|step| from.checked_add_days(Days::new(step)))
        .find(|date| mask.is_allowed(*date))
}

/// Nearest allowed day at or before `from` that is still after `floor`.
fn backward_to_allowed(from: NaiveDate, floor: NaiveDate, mask: DayMask) -> Option<NaiveDate> {
    (0..7u64)
        .filter_map(|step| from.checked_sub_days(Days::new(step)))
        .take_while(|date| *date > floor)
        .find(|date| mask.is_allowed(*date))
}

/// First allowed day on or after `init_at`. Nothing before the requested
/// start is eligible, so the restricted-days policy does not apply here.
pub fn first_activation(init_at: NaiveDate, mask: DayMask) -> Option<NaiveDate> {
    forward_to_allowed(init_at, mask)
}

/// Next activation after `previous`: `previous + repeat_interval` days,
/// moved onto an allowed day according to `policy`. `None` when the mask
/// is empty.
pub fn next_activation(
    previous: NaiveDate,
    repeat_interval: i64,
    mask: DayMask,
    policy: RestrictedDaysPolicy,
) -> Option<NaiveDate> {
    if mask.is_empty() {
        return None;
    }
    let interval = u64::try_from(repeat_interval.max(1)).ok()?;
    let candidate = previous.checked_add_days(Days::new(interval))?;
    if mask.is_allowed(candidate) {
        return Some(candidate);
    }
    match policy {
        RestrictedDaysPolicy::After => forward_to_allowed(candidate, mask),
        RestrictedDaysPolicy::Before => backward_to_allowed(candidate, previous, mask)
            .or_else(|| forward_to_allowed(candidate, mask)),
    }
}

/// Records one completed iteration and returns the replacement task.
pub fn complete_iteration(task: &Task, today: NaiveDate) -> Result<Task, RecurrenceError> {
    if task.finished {
        return Err(RecurrenceError::AlreadyFinished {
            id: task.id.clone(),
        });
    }
    let mut next = task.clone();
    next.iteration_count += 1;
    next.current_score += task.difficulty as f64;

    if !task.is_recurring || next.iteration_count >= task.iteration_limit {
        next.finished = true;
        return Ok(next);
    }

    if task.allowed_days.is_empty() {
        return Err(RecurrenceError::EmptyAllowedSet {
            id: task.id.clone(),
        });
    }
    let previous = task
        .next_activation_at
        .map(|at| at.date())
        .map_or(today, |date| date.max(today));
    let date = next_activation(
        previous,
        task.repeat_interval,
        task.allowed_days,
        task.restricted_days_policy,
    )
    .ok_or(RecurrenceError::OutOfRange)?;
    next.next_activation_at = Some(start_of_day(date).ok_or(RecurrenceError::OutOfRange)?);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskType;
    use chrono::{Datelike, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mwf() -> DayMask {
        DayMask::from_days([Weekday::Mon, Weekday::Wed, Weekday::Fri])
    }

    fn recurring(limit: i64) -> Task {
        Task {
            id: "task_r".into(),
            title: "Run".into(),
            task_type: TaskType::ToDo,
            is_optional: false,
            is_recurring: true,
            difficulty: 3,
            iteration_count: 0,
            iteration_limit: limit,
            current_score: 0.0,
            max_score: 3.0 * limit as f64,
            init_at: date(2024, 6, 10),
            next_activation_at: start_of_day(date(2024, 6, 10)),
            repeat_interval: 2,
            allowed_days: mwf(),
            restricted_days_policy: RestrictedDaysPolicy::After,
            finished: false,
            categories: vec![],
        }
    }

    #[test]
    fn first_activation_keeps_allowed_start() {
        let monday = date(2024, 6, 10);
        assert_eq!(first_activation(monday, mwf()), Some(monday));
        // Tuesday start moves to Wednesday.
        assert_eq!(first_activation(date(2024, 6, 11), mwf()), Some(date(2024, 6, 12)));
        assert_eq!(first_activation(monday, DayMask::EMPTY), None);
    }

    #[test]
    fn allowed_candidate_is_used_as_is() {
        // Mon + 2 = Wed.
        let next = next_activation(date(2024, 6, 10), 2, mwf(), RestrictedDaysPolicy::Before);
        assert_eq!(next, Some(date(2024, 6, 12)));
    }

    #[test]
    fn after_policy_walks_forward() {
        // Mon + 1 = Tue -> Wed.
        let next = next_activation(date(2024, 6, 10), 1, mwf(), RestrictedDaysPolicy::After);
        assert_eq!(next, Some(date(2024, 6, 12)));
    }

    #[test]
    fn before_policy_walks_back_but_not_past_previous() {
        // Mon + 5 = Sat -> Fri.
        let next = next_activation(date(2024, 6, 10), 5, mwf(), RestrictedDaysPolicy::Before);
        assert_eq!(next, Some(date(2024, 6, 14)));
        // Mon + 1 = Tue; stepping back would reach Monday itself, so go forward.
        let next = next_activation(date(2024, 6, 10), 1, mwf(), RestrictedDaysPolicy::Before);
        assert_eq!(next, Some(date(2024, 6, 12)));
    }

    #[test]
    fn results_always_land_on_allowed_days() {
        let start = date(2024, 6, 10);
        for bits in 1u8..=0b111_1111 {
            let mask = DayMask::from_bits(bits);
            for interval in 1..=10 {
                for policy in [RestrictedDaysPolicy::Before, RestrictedDaysPolicy::After] {
                    let next = next_activation(start, interval, mask, policy).unwrap();
                    assert!(mask.is_allowed(next));
                    assert!(next > start);
                    if policy == RestrictedDaysPolicy::After {
                        assert!(next >= start + Days::new(interval as u64));
                    }
                }
            }
        }
    }

    #[test]
    fn completing_non_recurring_finishes() {
        let mut task = recurring(5);
        task.is_recurring = false;
        let done = complete_iteration(&task, date(2024, 6, 10)).unwrap();
        assert!(done.finished);
        assert_eq!(done.iteration_count, 1);
        assert_eq!(done.current_score, 3.0);
        assert!(matches!(
            complete_iteration(&done, date(2024, 6, 10)),
            Err(RecurrenceError::AlreadyFinished { .. })
        ));
    }

    #[test]
    fn completing_recurring_advances() {
        let task = recurring(3);
        let once = complete_iteration(&task, date(2024, 6, 10)).unwrap();
        let twice = complete_iteration(&once, date(2024, 6, 12)).unwrap();
        assert!(!twice.finished);
        assert_eq!(twice.iteration_count, 2);
        let next = twice.next_activation_at.unwrap().date();
        assert_eq!(next, date(2024, 6, 14));
        assert_eq!(next.weekday(), Weekday::Fri);
        let third = complete_iteration(&twice, date(2024, 6, 14)).unwrap();
        assert!(third.finished);
        assert_eq!(third.current_score, 9.0);
    }

    #[test]
    fn late_completion_schedules_from_today() {
        let task = recurring(10);
        // Completed on Friday although it was due Monday: Fri + 2 = Sun -> Mon.
        let next = complete_iteration(&task, date(2024, 6, 14)).unwrap();
        assert_eq!(next.next_activation_at.unwrap().date(), date(2024, 6, 17));
    }
}
