#![forbid(unsafe_code)]

use super::tasks::{get_task, insert_task_tx, task_from_json, update_task_fields_tx};
use super::{OperationRow, SqliteStore, StoreError, UndoOutcome};
use rusqlite::{OptionalExtension, Transaction, params};
use serde_json::Value;
use td_core::model::{TaskPriority, TaskStatus};

pub(crate) fn record_op_tx(
    tx: &Transaction<'_>,
    ts_ms: i64,
    operation_type: &str,
    description: &str,
    data: &Value,
) -> Result<(), StoreError> {
    tx.execute(
        r#"
        INSERT INTO ops_history(ts_ms, operation_type, description, operation_data_json, undone)
        VALUES (?1, ?2, ?3, ?4, 0)
        "#,
        params![ts_ms, operation_type, description, data.to_string()],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Most recent operations first.
    pub fn list_operations(&self, limit: usize) -> Result<Vec<OperationRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, ts_ms, operation_type, description, operation_data_json, undone
            FROM ops_history
            ORDER BY seq DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(OperationRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                operation_type: row.get(2)?,
                description: row.get(3)?,
                operation_data_json: row.get(4)?,
                undone: row.get::<_, i64>(5)? != 0,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Reverses the newest not-yet-undone operation. Every precondition
    /// is checked before any row changes, so an undo either applies in
    /// full or leaves the store untouched.
    pub fn undo_last(&mut self) -> Result<UndoOutcome, StoreError> {
        let tx = self.conn.transaction()?;
        let row = tx
            .query_row(
                r#"
                SELECT seq, operation_type, description, operation_data_json
                FROM ops_history
                WHERE undone=0
                ORDER BY seq DESC
                LIMIT 1
                "#,
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((seq, operation_type, description, data_json)) = row else {
            return Err(StoreError::InvalidInput("no operations to undo"));
        };
        let data: Value = serde_json::from_str(&data_json)
            .map_err(|_| StoreError::InvalidInput("malformed operation data"))?;

        let details = match operation_type.as_str() {
            "task_add" | "task_import" => undo_created_tasks(&tx, seq, &data)?,
            "task_delete" => undo_delete(&tx, seq, &data)?,
            "task_update" => undo_update(&tx, seq, &data)?,
            other => {
                return Err(StoreError::StaleOperation {
                    seq,
                    reason: format!("operation type {other} cannot be undone"),
                });
            }
        };

        tx.execute("UPDATE ops_history SET undone=1 WHERE seq=?1", params![seq])?;
        tx.commit()?;
        Ok(UndoOutcome {
            seq,
            operation_type,
            description,
            details,
        })
    }
}

fn undo_created_tasks(tx: &Transaction<'_>, seq: i64, data: &Value) -> Result<String, StoreError> {
    let mut ids: Vec<String> = Vec::new();
    if let Some(id) = data.get("task_id").and_then(Value::as_str) {
        ids.push(id.to_string());
    }
    if let Some(list) = data.get("task_ids").and_then(Value::as_array) {
        for item in list {
            if let Some(id) = item.as_str() {
                ids.push(id.to_string());
            }
        }
    }
    if ids.is_empty() {
        return Err(StoreError::InvalidInput("malformed operation data"));
    }
    for id in &ids {
        if get_task(tx, id)?.is_none() {
            return Err(StoreError::StaleOperation {
                seq,
                reason: format!("task {id} no longer exists"),
            });
        }
    }
    for id in &ids {
        tx.execute("DELETE FROM tasks WHERE id=?1", params![id])?;
    }
    Ok(format!("Removed {}", ids.join(", ")))
}

fn undo_delete(tx: &Transaction<'_>, seq: i64, data: &Value) -> Result<String, StoreError> {
    let snapshot = data
        .get("task")
        .ok_or(StoreError::InvalidInput("malformed operation data"))?;
    let task = task_from_json(snapshot)?;
    if get_task(tx, &task.id)?.is_some() {
        return Err(StoreError::StaleOperation {
            seq,
            reason: format!("task {} already exists", task.id),
        });
    }
    insert_task_tx(tx, &task)?;
    Ok(format!("Restored {}", task.id))
}

fn undo_update(tx: &Transaction<'_>, seq: i64, data: &Value) -> Result<String, StoreError> {
    let malformed = || StoreError::InvalidInput("malformed operation data");
    let task_id = data
        .get("task_id")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?;
    let before = data.get("before").ok_or_else(malformed)?;
    let Some(mut task) = get_task(tx, task_id)? else {
        return Err(StoreError::StaleOperation {
            seq,
            reason: format!("task {task_id} no longer exists"),
        });
    };

    task.name = before
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?
        .to_string();
    task.description = before
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let status_raw = before
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?;
    task.status = TaskStatus::parse(status_raw).ok_or_else(malformed)?;
    let priority_raw = before
        .get("priority")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?;
    task.priority = TaskPriority::parse(priority_raw).ok_or_else(malformed)?;
    task.estimated_hours = before.get("estimated_hours").and_then(Value::as_f64);
    task.actual_hours = before.get("actual_hours").and_then(Value::as_f64);
    task.started_at_ms = before.get("started_at_ms").and_then(Value::as_i64);
    task.completed_at_ms = before.get("completed_at_ms").and_then(Value::as_i64);

    update_task_fields_tx(tx, &task)?;
    Ok(format!("Reverted {task_id}"))
}
