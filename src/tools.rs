//! Tool registrations. Each handler parses its JSON arguments, calls into the
//! store or the scheduling engine, and returns MCP text content.

use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

use crate::bucketing::{bucket_tasks, daily_categorized_tasks};
use crate::calendar::{month_grid, selectable_months, selectable_years};
use crate::dates::resolve_today;
use crate::day_mask::DayMask;
use crate::error::ToolError;
use crate::form::CreateTaskForm;
use crate::mcp::{text_result, McpServer};
use crate::task_store::TaskStore;
use crate::types::ListTasksOptions;
use crate::validation::{check_allowed_day, FieldErrorView};

pub type SharedStore = Rc<RefCell<TaskStore>>;

const TODAY_SCHEMA: &str = "Override for today's date, DD/MM/YYYY. Defaults to the local date.";

fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

fn today_arg(args: &Value) -> Result<chrono::NaiveDate, ToolError> {
    Ok(resolve_today(str_arg(args, "today"))?)
}

fn day_names_arg(args: &Value, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect()
    })
}

pub fn add_category(store: &SharedStore, args: Value) -> Result<Value, ToolError> {
    let name = str_arg(&args, "name").ok_or_else(|| ToolError::invalid_params("name is required"))?;
    let category = store.borrow().add_category(name)?;
    Ok(text_result(json!({ "category": category })))
}

pub fn list_categories(store: &SharedStore, _args: Value) -> Result<Value, ToolError> {
    let categories = store.borrow().list_categories()?;
    Ok(text_result(json!({
        "count": categories.len(),
        "categories": categories
    })))
}

/// Validates form-shaped input. Field failures come back as a normal result
/// with `ok: false` so clients can show them next to the inputs.
pub fn add_task(store: &SharedStore, args: Value) -> Result<Value, ToolError> {
    let form: CreateTaskForm = serde_json::from_value(args)?;
    let dto = match form.validate() {
        Ok(dto) => dto,
        Err(errors) => {
            let views: Vec<FieldErrorView> = errors.iter().map(FieldErrorView::from).collect();
            return Ok(text_result(json!({ "ok": false, "errors": views })));
        }
    };
    let task = store.borrow_mut().add_task(dto)?;
    Ok(text_result(json!({ "ok": true, "task": task })))
}

fn list_options(args: &Value) -> ListTasksOptions {
    ListTasksOptions {
        include_finished: args
            .get("include_finished")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        category_id: args.get("categoryId").and_then(|v| v.as_i64()),
        limit: args.get("limit").and_then(|v| v.as_i64()),
    }
}

pub fn list_tasks(store: &SharedStore, args: Value) -> Result<Value, ToolError> {
    let tasks = store.borrow().list_tasks(list_options(&args))?;
    Ok(text_result(json!({ "count": tasks.len(), "tasks": tasks })))
}

pub fn tasks_by_time_range(store: &SharedStore, args: Value) -> Result<Value, ToolError> {
    let today = today_arg(&args)?;
    let tasks = store.borrow().list_tasks(ListTasksOptions {
        limit: None,
        ..list_options(&args)
    })?;
    let report = bucket_tasks(&tasks, today);
    Ok(text_result(json!({
        "today": today,
        "buckets": report.buckets,
        "skipped": report.skipped
    })))
}

pub fn daily_categorized(store: &SharedStore, args: Value) -> Result<Value, ToolError> {
    let today = today_arg(&args)?;
    let tasks = store.borrow().list_tasks(ListTasksOptions::default())?;
    let groups = daily_categorized_tasks(&tasks, today);
    Ok(text_result(json!({ "today": today, "categories": groups })))
}

pub fn complete_task(store: &SharedStore, args: Value) -> Result<Value, ToolError> {
    let id = str_arg(&args, "id").ok_or_else(|| ToolError::invalid_params("id is required"))?;
    let today = today_arg(&args)?;
    let task = store.borrow().complete_task(id, today)?;
    Ok(text_result(json!({ "updated": task })))
}

pub fn check_date(args: Value) -> Result<Value, ToolError> {
    let date = str_arg(&args, "date").ok_or_else(|| ToolError::invalid_params("date is required"))?;
    let days = day_names_arg(&args, "allowedDays")
        .ok_or_else(|| ToolError::invalid_params("allowedDays is required"))?;
    let result = match check_allowed_day(date, &days) {
        Ok(parsed) => json!({ "ok": true, "date": parsed }),
        Err(error) => json!({
            "ok": false,
            "code": error.code(),
            "message": error.to_string()
        }),
    };
    Ok(text_result(result))
}

pub fn calendar_month(args: Value) -> Result<Value, ToolError> {
    let today = today_arg(&args)?;
    let year = args
        .get("year")
        .and_then(|v| v.as_i64())
        .map(i32::try_from)
        .transpose()
        .map_err(|_| ToolError::invalid_params("year is out of range"))?
        .unwrap_or_else(|| chrono::Datelike::year(&today));
    let month = args
        .get("month")
        .and_then(|v| v.as_u64())
        .map(u32::try_from)
        .transpose()
        .map_err(|_| ToolError::invalid_params("month is out of range"))?
        .unwrap_or_else(|| chrono::Datelike::month(&today));
    let mask = match day_names_arg(&args, "allowedDays") {
        Some(names) => DayMask::encode(&names),
        None => DayMask::ALL,
    };
    let grid = month_grid(year, month, today, mask)?;
    Ok(text_result(json!({
        "grid": grid,
        "years": selectable_years(today, 1),
        "months": selectable_months(year, today)
    })))
}

pub fn register_tools(server: &mut McpServer, store: SharedStore) {
    let today_prop = json!({ "type": "string", "description": TODAY_SCHEMA });
    let days_prop = json!({ "type": "array", "items": { "type": "string" } });

    {
        let store = store.clone();
        server.register_tool(
            "add_category",
            "Create a task category.",
            json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }),
            Box::new(move |args| add_category(&store, args)),
        );
    }

    {
        let store = store.clone();
        server.register_tool(
            "list_categories",
            "List all categories.",
            json!({ "type": "object", "properties": {} }),
            Box::new(move |args| list_categories(&store, args)),
        );
    }

    {
        let store = store.clone();
        server.register_tool(
            "add_task",
            "Validate a create-task form and store the task.",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "categoryIds": { "type": "array", "items": { "type": "integer" } },
                    "scheduleFor": { "type": "string", "enum": ["Today", "Tomorrow", "Recurring"] },
                    "type": { "type": "string", "enum": ["TO_DO"] },
                    "difficulty": { "type": ["string", "integer"] },
                    "iterationLimit": { "type": ["string", "integer"] },
                    "isOptional": { "type": ["string", "boolean"] },
                    "initAt": { "type": "string", "description": "DD/MM/YYYY" },
                    "repeatInterval": { "type": ["string", "integer"] },
                    "allowedDays": days_prop,
                    "restrictedDaysPolicy": { "type": "string", "enum": ["BEFORE", "AFTER"] }
                },
                "required": ["title", "categoryIds"]
            }),
            Box::new(move |args| add_task(&store, args)),
        );
    }

    {
        let store = store.clone();
        server.register_tool(
            "list_tasks",
            "List tasks in creation order.",
            json!({
                "type": "object",
                "properties": {
                    "include_finished": { "type": "boolean" },
                    "categoryId": { "type": "integer" },
                    "limit": { "type": "integer", "minimum": 1 }
                }
            }),
            Box::new(move |args| list_tasks(&store, args)),
        );
    }

    {
        let store = store.clone();
        server.register_tool(
            "tasks_by_time_range",
            "Group tasks into Today, Tomorrow, Next 7 days, Next 30 days and Not soon.",
            json!({
                "type": "object",
                "properties": {
                    "today": today_prop,
                    "include_finished": { "type": "boolean" },
                    "categoryId": { "type": "integer" }
                }
            }),
            Box::new(move |args| tasks_by_time_range(&store, args)),
        );
    }

    {
        let store = store.clone();
        server.register_tool(
            "daily_categorized_tasks",
            "Today's tasks grouped by category.",
            json!({
                "type": "object",
                "properties": { "today": today_prop }
            }),
            Box::new(move |args| daily_categorized(&store, args)),
        );
    }

    {
        let store = store.clone();
        server.register_tool(
            "complete_task",
            "Record a completed iteration and schedule the next activation.",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "today": today_prop
                },
                "required": ["id"]
            }),
            Box::new(move |args| complete_task(&store, args)),
        );
    }

    server.register_tool(
        "check_date",
        "Check a DD/MM/YYYY date against a set of allowed weekdays.",
        json!({
            "type": "object",
            "properties": {
                "date": { "type": "string" },
                "allowedDays": days_prop
            },
            "required": ["date", "allowedDays"]
        }),
        Box::new(check_date),
    );

    server.register_tool(
        "calendar_month",
        "Month grid with selectable days for a date picker.",
        json!({
            "type": "object",
            "properties": {
                "year": { "type": "integer" },
                "month": { "type": "integer", "minimum": 1, "maximum": 12 },
                "allowedDays": days_prop,
                "today": today_prop
            }
        }),
        Box::new(calendar_month),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SharedStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tools.sqlite");
        let store = TaskStore::new(path.to_str().unwrap()).unwrap();
        (dir, Rc::new(RefCell::new(store)))
    }

    fn payload(result: Value) -> Value {
        result["structuredContent"].clone()
    }

    #[test]
    fn add_task_reports_field_errors_as_result() {
        let (_dir, store) = store();
        let result = add_task(&store, json!({ "initAt": "31/02/2024" })).unwrap();
        let body = payload(result);
        assert_eq!(body["ok"], false);
        let codes: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["code"].as_str())
            .collect();
        assert_eq!(codes, vec!["title_required", "category_required", "malformed_date"]);
    }

    #[test]
    fn created_task_shows_up_in_todays_bucket() {
        let (_dir, store) = store();
        let category = payload(add_category(&store, json!({ "name": "Home" })).unwrap());
        let id = category["category"]["id"].as_i64().unwrap();
        let created = payload(
            add_task(
                &store,
                json!({ "title": "Dishes", "categoryIds": [id], "initAt": "10/06/2024" }),
            )
            .unwrap(),
        );
        assert_eq!(created["ok"], true);

        let buckets = payload(tasks_by_time_range(&store, json!({ "today": "10/06/2024" })).unwrap());
        assert_eq!(buckets["buckets"][0]["range"], "TODAY");
        assert_eq!(buckets["buckets"][0]["tasks"][0]["title"], "Dishes");

        let daily = payload(daily_categorized(&store, json!({ "today": "10/06/2024" })).unwrap());
        assert_eq!(daily["categories"][0]["category"]["name"], "Home");
    }

    #[test]
    fn score_overflow_is_an_invalid_param() {
        let (_dir, store) = store();
        let category = payload(add_category(&store, json!({ "name": "Home" })).unwrap());
        let id = category["category"]["id"].as_i64().unwrap();
        let err = add_task(
            &store,
            json!({
                "title": "Marathon",
                "categoryIds": [id],
                "initAt": "10/06/2024",
                "difficulty": "9223372036854775807",
                "iterationLimit": "2"
            }),
        )
        .unwrap_err();
        assert_eq!(err.code(), -32602);
        let listed = payload(list_tasks(&store, json!({})).unwrap());
        assert_eq!(listed["count"], 0);
    }

    #[test]
    fn numeric_fields_out_of_range_come_back_as_field_errors() {
        let (_dir, store) = store();
        let body = payload(
            add_task(
                &store,
                json!({
                    "title": "Stretch",
                    "categoryIds": [1],
                    "initAt": "10/06/2024",
                    "difficulty": 0,
                    "repeatInterval": 400
                }),
            )
            .unwrap(),
        );
        assert_eq!(body["ok"], false);
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert_eq!(fields, vec!["difficulty", "repeatInterval"]);
    }

    #[test]
    fn unknown_category_is_an_invalid_param() {
        let (_dir, store) = store();
        let err = add_task(
            &store,
            json!({ "title": "Orphan", "categoryIds": [99], "initAt": "10/06/2024" }),
        )
        .unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn check_date_reports_disallowed_day() {
        let body = payload(
            check_date(json!({ "date": "11/06/2024", "allowedDays": ["Mon", "Wed", "Fri"] })).unwrap(),
        );
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "disallowed_day");
        let body = payload(
            check_date(json!({ "date": "14/06/2024", "allowedDays": ["Mon", "Wed", "Fri"] })).unwrap(),
        );
        assert_eq!(body["ok"], true);
        assert_eq!(body["date"], "2024-06-14");
    }

    #[test]
    fn calendar_month_defaults_to_current_period() {
        let body = payload(calendar_month(json!({ "today": "10/06/2024", "allowedDays": ["Mon"] })).unwrap());
        assert_eq!(body["grid"]["year"], 2024);
        assert_eq!(body["grid"]["month"], 6);
        assert_eq!(body["years"], json!([2024, 2025]));
        assert_eq!(body["months"][0]["name"], "June");
        let err = calendar_month(json!({ "month": 13 })).unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn registers_every_tool() {
        let (_dir, store) = store();
        let mut server = McpServer::new("t", "0");
        register_tools(&mut server, store);
        assert_eq!(
            server.tool_names(),
            vec![
                "add_category",
                "add_task",
                "calendar_month",
                "check_date",
                "complete_task",
                "daily_categorized_tasks",
                "list_categories",
                "list_tasks",
                "tasks_by_time_range",
            ]
        );
    }
}
