#![forbid(unsafe_code)]

use super::ops_history::record_op_tx;
use super::{SqliteStore, StoreError, TaskAddRequest, TaskRow};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde_json::{Value, json};
use td_core::ids::format_task_id;
use td_core::model::{TaskPatch, TaskPriority, TaskStatus};

pub(crate) const TASK_COLUMNS: &str = "id, name, description, status, priority, \
     depends_on_json, files_to_edit_json, related_kb_json, \
     estimated_hours, actual_hours, created_at_ms, started_at_ms, completed_at_ms";

pub(crate) fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn decode_list(idx: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    let status_raw: String = row.get(3)?;
    let status = TaskStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown task status: {status_raw}").into(),
        )
    })?;
    let priority_raw: String = row.get(4)?;
    let priority = TaskPriority::parse(&priority_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown task priority: {priority_raw}").into(),
        )
    })?;
    let depends_on_raw: String = row.get(5)?;
    let files_raw: String = row.get(6)?;
    let related_raw: String = row.get(7)?;
    Ok(TaskRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status,
        priority,
        depends_on: decode_list(5, &depends_on_raw)?,
        files_to_edit: decode_list(6, &files_raw)?,
        related_kb: decode_list(7, &related_raw)?,
        estimated_hours: row.get(8)?,
        actual_hours: row.get(9)?,
        created_at_ms: row.get(10)?,
        started_at_ms: row.get(11)?,
        completed_at_ms: row.get(12)?,
    })
}

pub(crate) fn get_task(conn: &Connection, id: &str) -> Result<Option<TaskRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id=?1"),
            params![id],
            map_task_row,
        )
        .optional()?)
}

pub(crate) fn task_exists_tx(tx: &Transaction<'_>, id: &str) -> Result<bool, StoreError> {
    Ok(tx
        .query_row("SELECT 1 FROM tasks WHERE id=?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

pub(crate) fn insert_task_tx(tx: &Transaction<'_>, task: &TaskRow) -> Result<(), StoreError> {
    let inserted = tx.execute(
        r#"
        INSERT OR IGNORE INTO tasks(
          id, name, description, status, priority,
          depends_on_json, files_to_edit_json, related_kb_json,
          estimated_hours, actual_hours, created_at_ms, started_at_ms, completed_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            task.id,
            task.name,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            encode_list(&task.depends_on),
            encode_list(&task.files_to_edit),
            encode_list(&task.related_kb),
            task.estimated_hours,
            task.actual_hours,
            task.created_at_ms,
            task.started_at_ms,
            task.completed_at_ms,
        ],
    )?;
    if inserted == 0 {
        return Err(StoreError::DuplicateId {
            id: task.id.clone(),
        });
    }
    Ok(())
}

pub(crate) fn task_to_json(task: &TaskRow) -> Value {
    json!({
        "id": task.id,
        "name": task.name,
        "description": task.description,
        "status": task.status.as_str(),
        "priority": task.priority.as_str(),
        "depends_on": task.depends_on,
        "files_to_edit": task.files_to_edit,
        "related_kb": task.related_kb,
        "estimated_hours": task.estimated_hours,
        "actual_hours": task.actual_hours,
        "created_at_ms": task.created_at_ms,
        "started_at_ms": task.started_at_ms,
        "completed_at_ms": task.completed_at_ms,
    })
}

pub(crate) fn task_from_json(value: &Value) -> Result<TaskRow, StoreError> {
    let malformed = || StoreError::InvalidInput("malformed task snapshot");
    let str_field = |key: &str| -> Result<String, StoreError> {
        Ok(value
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(malformed)?
            .to_string())
    };
    let list_field = |key: &str| -> Result<Vec<String>, StoreError> {
        value
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(malformed)?
            .iter()
            .map(|item| Ok(item.as_str().ok_or_else(malformed)?.to_string()))
            .collect()
    };
    let status_raw = str_field("status")?;
    let priority_raw = str_field("priority")?;
    Ok(TaskRow {
        id: str_field("id")?,
        name: str_field("name")?,
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        status: TaskStatus::parse(&status_raw).ok_or_else(malformed)?,
        priority: TaskPriority::parse(&priority_raw).ok_or_else(malformed)?,
        depends_on: list_field("depends_on")?,
        files_to_edit: list_field("files_to_edit")?,
        related_kb: list_field("related_kb")?,
        estimated_hours: value.get("estimated_hours").and_then(Value::as_f64),
        actual_hours: value.get("actual_hours").and_then(Value::as_f64),
        created_at_ms: value
            .get("created_at_ms")
            .and_then(Value::as_i64)
            .ok_or_else(malformed)?,
        started_at_ms: value.get("started_at_ms").and_then(Value::as_i64),
        completed_at_ms: value.get("completed_at_ms").and_then(Value::as_i64),
    })
}

impl SqliteStore {
    pub fn task_add(&mut self, request: TaskAddRequest) -> Result<TaskRow, StoreError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("name must not be empty"));
        }

        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        for dep in &request.depends_on {
            if !task_exists_tx(&tx, dep)? {
                return Err(StoreError::NotFound { id: dep.clone() });
            }
        }
        let seq = super::next_counter_tx(&tx, super::TASK_SEQ_COUNTER)?;
        let task = TaskRow {
            id: format_task_id(seq),
            name,
            description: request.description,
            status: TaskStatus::Pending,
            priority: request.priority,
            depends_on: request.depends_on,
            files_to_edit: request.files_to_edit,
            related_kb: request.related_kb,
            estimated_hours: request.estimated_hours,
            actual_hours: None,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
        };
        insert_task_tx(&tx, &task)?;
        record_op_tx(
            &tx,
            now_ms,
            "task_add",
            &format!("Added task {} ({})", task.id, task.name),
            &json!({ "task_id": task.id }),
        )?;
        tx.commit()?;
        Ok(task)
    }

    pub fn task_get(&self, id: &str) -> Result<TaskRow, StoreError> {
        get_task(&self.conn, id)?.ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    pub fn task_list(
        &self,
        status: Option<TaskStatus>,
        priority: Option<TaskPriority>,
    ) -> Result<Vec<TaskRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"))?;
        let rows = stmt.query_map([], map_task_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            let task = row?;
            if let Some(wanted) = status
                && task.status != wanted
            {
                continue;
            }
            if let Some(wanted) = priority
                && task.priority != wanted
            {
                continue;
            }
            tasks.push(task);
        }
        Ok(tasks)
    }

    pub fn task_update(&mut self, id: &str, patch: &TaskPatch) -> Result<TaskRow, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidInput("no fields to update"));
        }
        let before = self.task_get(id)?;
        let mut after = before.clone();
        if let Some(name) = &patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::InvalidInput("name must not be empty"));
            }
            after.name = name.to_string();
        }
        if let Some(description) = &patch.description {
            after.description = description.clone();
        }
        if let Some(status) = patch.status {
            after.status = status;
            if status == TaskStatus::InProgress && before.status != TaskStatus::InProgress {
                after.started_at_ms.get_or_insert(super::now_ms());
            }
            if status == TaskStatus::Completed && before.status != TaskStatus::Completed {
                after.completed_at_ms.get_or_insert(super::now_ms());
            }
        }
        if let Some(priority) = patch.priority {
            after.priority = priority;
        }
        if let Some(estimated_hours) = patch.estimated_hours {
            if let Some(hours) = estimated_hours
                && !(hours.is_finite() && hours >= 0.0)
            {
                return Err(StoreError::InvalidInput(
                    "estimated_hours must be a non-negative number",
                ));
            }
            after.estimated_hours = estimated_hours;
        }
        if let Some(actual_hours) = patch.actual_hours {
            if let Some(hours) = actual_hours
                && !(hours.is_finite() && hours >= 0.0)
            {
                return Err(StoreError::InvalidInput(
                    "actual_hours must be a non-negative number",
                ));
            }
            after.actual_hours = actual_hours;
        }
        if after == before {
            return Ok(before);
        }

        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        update_task_fields_tx(&tx, &after)?;
        record_op_tx(
            &tx,
            now_ms,
            "task_update",
            &format!("Updated task {} ({})", after.id, after.name),
            &json!({
                "task_id": before.id,
                "before": {
                    "name": before.name,
                    "description": before.description,
                    "status": before.status.as_str(),
                    "priority": before.priority.as_str(),
                    "estimated_hours": before.estimated_hours,
                    "actual_hours": before.actual_hours,
                    "started_at_ms": before.started_at_ms,
                    "completed_at_ms": before.completed_at_ms,
                },
            }),
        )?;
        tx.commit()?;
        Ok(after)
    }

    pub fn task_delete(&mut self, id: &str) -> Result<TaskRow, StoreError> {
        let task = self.task_get(id)?;
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tasks WHERE id=?1", params![id])?;
        record_op_tx(
            &tx,
            now_ms,
            "task_delete",
            &format!("Deleted task {} ({})", task.id, task.name),
            &json!({ "task": task_to_json(&task) }),
        )?;
        tx.commit()?;
        Ok(task)
    }

    /// Highest-priority pending task whose dependencies are all completed.
    /// Priority ties resolve to the smallest id, so the pick is stable.
    pub fn next_task(&self) -> Result<Option<TaskRow>, StoreError> {
        let tasks = self.task_list(None, None)?;
        let mut best: Option<&TaskRow> = None;
        for task in &tasks {
            if task.status != TaskStatus::Pending {
                continue;
            }
            let ready = task.depends_on.iter().all(|dep| {
                tasks
                    .iter()
                    .any(|other| other.id == *dep && other.status == TaskStatus::Completed)
            });
            if !ready {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => task.priority.rank() > current.priority.rank(),
            };
            if better {
                best = Some(task);
            }
        }
        Ok(best.cloned())
    }
}

pub(crate) fn update_task_fields_tx(tx: &Transaction<'_>, task: &TaskRow) -> Result<(), StoreError> {
    tx.execute(
        r#"
        UPDATE tasks SET
          name=?2, description=?3, status=?4, priority=?5,
          estimated_hours=?6, actual_hours=?7, started_at_ms=?8, completed_at_ms=?9
        WHERE id=?1
        "#,
        params![
            task.id,
            task.name,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.estimated_hours,
            task.actual_hours,
            task.started_at_ms,
            task.completed_at_ms,
        ],
    )?;
    Ok(())
}
