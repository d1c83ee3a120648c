use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::dates::{format_iso_datetime, parse_iso_date, parse_iso_datetime, start_of_day};
use crate::day_mask::DayMask;
use crate::error::StoreError;
use crate::form::{MAX_REPEAT_INTERVAL, MIN_REPEAT_INTERVAL};
use crate::recurrence::{complete_iteration, first_activation};
use crate::types::{Category, CreateTaskDto, ListTasksOptions, RestrictedDaysPolicy, Task, TaskType};
use crate::utils::{generate_id, now_iso};

pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(
            r#"
      CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
      );
      CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        task_type TEXT NOT NULL,
        is_optional INTEGER NOT NULL,
        is_recurring INTEGER NOT NULL,
        difficulty INTEGER NOT NULL,
        iteration_count INTEGER NOT NULL,
        iteration_limit INTEGER NOT NULL,
        current_score REAL NOT NULL,
        max_score REAL NOT NULL,
        init_at TEXT NOT NULL,
        next_activation_at TEXT,
        repeat_interval INTEGER NOT NULL,
        allowed_days INTEGER NOT NULL,
        restricted_days_policy TEXT NOT NULL,
        finished INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
      );
      CREATE TABLE IF NOT EXISTS task_categories (
        task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        position INTEGER NOT NULL,
        PRIMARY KEY (task_id, category_id)
      );
      CREATE INDEX IF NOT EXISTS tasks_finished_idx ON tasks(finished);
      CREATE INDEX IF NOT EXISTS tasks_created_idx ON tasks(created_at);
      CREATE INDEX IF NOT EXISTS task_categories_category_idx ON task_categories(category_id);
      "#,
        )?;
        tracing::debug!(db_path, "task store ready");
        Ok(Self { conn })
    }

    pub fn add_category(&self, name: &str) -> Result<Category, StoreError> {
        let trimmed = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if trimmed.is_empty() {
            return Err(StoreError::InvalidInput("category name is required".to_string()));
        }
        let key = trimmed.to_lowercase();
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE name_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::DuplicateCategory(trimmed));
        }
        self.conn.execute(
            "INSERT INTO categories (name, name_key, created_at) VALUES (?1, ?2, ?3)",
            params![trimmed, key, now_iso()],
        )?;
        let category = Category {
            id: self.conn.last_insert_rowid(),
            name: trimmed,
        };
        tracing::info!(id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut categories = Vec::new();
        for category in rows {
            categories.push(category?);
        }
        Ok(categories)
    }

    pub fn add_task(&mut self, input: CreateTaskDto) -> Result<Task, StoreError> {
        let categories = self.resolve_categories(&input.category_ids)?;
        let task = build_task(input, categories)?;
        let now = now_iso();
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
        INSERT INTO tasks (
          id, title, task_type, is_optional, is_recurring, difficulty,
          iteration_count, iteration_limit, current_score, max_score,
          init_at, next_activation_at, repeat_interval, allowed_days,
          restricted_days_policy, finished, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
            params![
                task.id,
                task.title,
                task.task_type.as_str(),
                task.is_optional,
                task.is_recurring,
                task.difficulty,
                task.iteration_count,
                task.iteration_limit,
                task.current_score,
                task.max_score,
                task.init_at.to_string(),
                task.next_activation_at.map(format_iso_datetime),
                task.repeat_interval,
                i64::from(task.allowed_days.bits()),
                task.restricted_days_policy.as_str(),
                task.finished,
                now,
                now
            ],
        )?;
        for (position, category) in task.categories.iter().enumerate() {
            tx.execute(
                "INSERT INTO task_categories (task_id, category_id, position) VALUES (?1, ?2, ?3)",
                params![task.id, category.id, position as i64],
            )?;
        }
        tx.commit()?;
        tracing::info!(id = %task.id, title = %task.title, recurring = task.is_recurring, "task created");
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => {
                let mut task = from_row(row)?;
                task.categories = self.load_categories(&task.id)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    pub fn list_tasks(&self, options: ListTasksOptions) -> Result<Vec<Task>, StoreError> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();
        if !options.include_finished {
            conditions.push("finished = 0");
        }
        if let Some(category_id) = options.category_id {
            conditions.push("id IN (SELECT task_id FROM task_categories WHERE category_id = ?)");
            params.push(SqlValue::from(category_id));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT * FROM tasks {} ORDER BY created_at ASC, rowid ASC LIMIT ?",
            where_clause
        );
        // SQLite treats a negative limit as "no limit".
        params.push(SqlValue::from(options.limit.map(|l| l.max(1)).unwrap_or(-1)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(from_row(row)?);
        }
        for task in &mut tasks {
            task.categories = self.load_categories(&task.id)?;
        }
        Ok(tasks)
    }

    /// Marks one iteration done and stores the replacement row.
    pub fn complete_task(&self, id: &str, today: NaiveDate) -> Result<Task, StoreError> {
        let existing = self
            .get_task(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let updated = complete_iteration(&existing, today)?;
        self.conn.execute(
            r#"
        UPDATE tasks SET
          iteration_count = ?1,
          current_score = ?2,
          next_activation_at = ?3,
          finished = ?4,
          updated_at = ?5
        WHERE id = ?6
        "#,
            params![
                updated.iteration_count,
                updated.current_score,
                updated.next_activation_at.map(format_iso_datetime),
                updated.finished,
                now_iso(),
                updated.id
            ],
        )?;
        tracing::info!(
            id = %updated.id,
            iteration = updated.iteration_count,
            finished = updated.finished,
            "task iteration completed"
        );
        Ok(updated)
    }

    fn resolve_categories(&self, ids: &[i64]) -> Result<Vec<Category>, StoreError> {
        if ids.is_empty() {
            return Err(StoreError::InvalidInput("at least one category is required".to_string()));
        }
        let mut categories: Vec<Category> = Vec::new();
        for id in ids {
            if categories.iter().any(|c| c.id == *id) {
                continue;
            }
            let category = self
                .conn
                .query_row(
                    "SELECT id, name FROM categories WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    },
                )
                .optional()?
                .ok_or(StoreError::UnknownCategory(*id))?;
            categories.push(category);
        }
        Ok(categories)
    }

    fn load_categories(&self, task_id: &str) -> Result<Vec<Category>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
        SELECT c.id, c.name FROM task_categories tc
        JOIN categories c ON c.id = tc.category_id
        WHERE tc.task_id = ?1
        ORDER BY tc.position ASC
        "#,
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut categories = Vec::new();
        for category in rows {
            categories.push(category?);
        }
        Ok(categories)
    }
}

fn build_task(input: CreateTaskDto, categories: Vec<Category>) -> Result<Task, StoreError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(StoreError::InvalidInput("title is required".to_string()));
    }
    if input.difficulty < 1 || input.iteration_limit < 1 {
        return Err(StoreError::InvalidInput(
            "difficulty and iterationLimit must be at least 1".to_string(),
        ));
    }
    if !(MIN_REPEAT_INTERVAL..=MAX_REPEAT_INTERVAL).contains(&input.repeat_interval) {
        return Err(StoreError::InvalidInput(format!(
            "repeatInterval must be between {MIN_REPEAT_INTERVAL} and {MAX_REPEAT_INTERVAL}"
        )));
    }
    if input.allowed_days.is_empty() {
        return Err(StoreError::InvalidInput(
            "at least one allowed day must be selected".to_string(),
        ));
    }
    let max_score = input
        .difficulty
        .checked_mul(input.iteration_limit)
        .ok_or_else(|| {
            StoreError::InvalidInput("difficulty times iterationLimit is too large".to_string())
        })?;
    let next_activation_at = first_activation(input.init_at, input.allowed_days)
        .and_then(start_of_day)
        .ok_or_else(|| StoreError::InvalidInput("initAt is out of range".to_string()))?;
    Ok(Task {
        id: generate_id("task"),
        title,
        task_type: input.task_type,
        is_optional: input.is_optional,
        is_recurring: input.is_recurring,
        difficulty: input.difficulty,
        iteration_count: 0,
        iteration_limit: input.iteration_limit,
        current_score: 0.0,
        max_score: max_score as f64,
        init_at: input.init_at,
        next_activation_at: Some(next_activation_at),
        repeat_interval: input.repeat_interval,
        allowed_days: input.allowed_days,
        restricted_days_policy: input.restricted_days_policy,
        finished: false,
        categories,
    })
}

fn from_row(row: &Row) -> Result<Task, StoreError> {
    let task_type: String = row.get("task_type")?;
    let policy: String = row.get("restricted_days_policy")?;
    let init_at: String = row.get("init_at")?;
    let next_activation_at: Option<String> = row.get("next_activation_at")?;
    let allowed_days: i64 = row.get("allowed_days")?;
    let next_activation_at = match next_activation_at {
        Some(raw) => Some(parse_iso_datetime(&raw).ok_or(StoreError::CorruptRow {
            field: "next_activation_at",
            value: raw,
        })?),
        None => None,
    };
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        task_type: TaskType::parse(&task_type).ok_or(StoreError::CorruptRow {
            field: "task_type",
            value: task_type.clone(),
        })?,
        is_optional: row.get("is_optional")?,
        is_recurring: row.get("is_recurring")?,
        difficulty: row.get("difficulty")?,
        iteration_count: row.get("iteration_count")?,
        iteration_limit: row.get("iteration_limit")?,
        current_score: row.get("current_score")?,
        max_score: row.get("max_score")?,
        init_at: parse_iso_date(&init_at).ok_or(StoreError::CorruptRow {
            field: "init_at",
            value: init_at.clone(),
        })?,
        next_activation_at,
        repeat_interval: row.get("repeat_interval")?,
        allowed_days: DayMask::from_bits((allowed_days & 0x7f) as u8),
        restricted_days_policy: RestrictedDaysPolicy::parse(&policy).ok_or(StoreError::CorruptRow {
            field: "restricted_days_policy",
            value: policy.clone(),
        })?,
        finished: row.get("finished")?,
        categories: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, TaskStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.sqlite");
        let store = TaskStore::new(path.to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn dto(category_id: i64) -> CreateTaskDto {
        CreateTaskDto {
            title: "Laundry".to_string(),
            task_type: TaskType::ToDo,
            is_optional: false,
            is_recurring: false,
            difficulty: 2,
            iteration_limit: 1,
            init_at: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            repeat_interval: 1,
            allowed_days: DayMask::ALL,
            restricted_days_policy: RestrictedDaysPolicy::Before,
            category_ids: vec![category_id],
        }
    }

    #[test]
    fn oversized_score_is_rejected() {
        let (_dir, mut store) = open();
        let category = store.add_category("Chores").unwrap();
        let input = CreateTaskDto {
            difficulty: i64::MAX,
            iteration_limit: 2,
            ..dto(category.id)
        };
        assert!(matches!(store.add_task(input), Err(StoreError::InvalidInput(_))));
        assert!(store.list_tasks(ListTasksOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn unknown_policy_in_row_is_corrupt() {
        let (_dir, mut store) = open();
        let category = store.add_category("Chores").unwrap();
        let task = store.add_task(dto(category.id)).unwrap();
        store
            .conn
            .execute(
                "UPDATE tasks SET restricted_days_policy = 'SIDEWAYS' WHERE id = ?1",
                params![task.id],
            )
            .unwrap();
        match store.get_task(&task.id) {
            Err(StoreError::CorruptRow { field, value }) => {
                assert_eq!(field, "restricted_days_policy");
                assert_eq!(value, "SIDEWAYS");
            }
            other => panic!("expected corrupt row, got {other:?}"),
        }
    }
}
