pub mod bucketing;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod day_mask;
pub mod error;
pub mod form;
pub mod mcp;
pub mod recurrence;
pub mod task_store;
pub mod tools;
pub mod types;
pub mod utils;
pub mod validation;
