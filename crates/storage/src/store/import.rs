#![forbid(unsafe_code)]

use super::ops_history::record_op_tx;
use super::tasks::insert_task_tx;
use super::{
    ImportPreview, ImportStatus, NextTask, SqliteStore, StoreError, TaskImportOutcome,
    TaskImportRequest, TaskRow, TaskSummary,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use td_core::graph::{self, DependencyGraph, OrderKey};
use td_core::ids::format_task_id;
use td_core::model::TaskStatus;
use td_core::validate::{
    BatchContext, TaskDraft, batch_cycle, validate_batch, validate_batch_references,
    validate_draft,
};

impl SqliteStore {
    /// Batch import with a chosen recovery strategy. Validation errors
    /// are reported in the outcome rather than as `Err`; `Err` is
    /// reserved for storage failures.
    pub fn import_tasks(
        &mut self,
        request: TaskImportRequest,
    ) -> Result<TaskImportOutcome, StoreError> {
        if request.drafts.is_empty() {
            return Ok(failure(vec!["document contains no tasks".to_string()]));
        }

        let existing: Vec<(String, Vec<String>)> = self
            .task_list(None, None)?
            .into_iter()
            .map(|task| (task.id, task.depends_on))
            .collect();
        let base_seq = self.counter_value(super::TASK_SEQ_COUNTER)?;
        let assigned: Vec<String> = (1..=request.drafts.len() as i64)
            .map(|offset| format_task_id(base_seq + offset))
            .collect();
        let ctx = BatchContext {
            existing: &existing,
            assigned_ids: &assigned,
        };

        if request.dry_run {
            let errors = batch_errors(&request, &ctx);
            let status = if errors.is_empty() {
                ImportStatus::Success
            } else {
                ImportStatus::Error
            };
            return Ok(TaskImportOutcome {
                status,
                imported: 0,
                task_ids: Vec::new(),
                errors,
                skipped: Vec::new(),
                next_task: None,
                tasks_to_create: None,
                preview: Some(build_preview(&request.drafts)),
            });
        }

        if !request.skip_confirmation && request.drafts.len() >= request.confirmation_threshold {
            return Ok(TaskImportOutcome {
                status: ImportStatus::ConfirmationRequired,
                imported: 0,
                task_ids: Vec::new(),
                errors: Vec::new(),
                skipped: Vec::new(),
                next_task: None,
                tasks_to_create: Some(request.drafts.len()),
                preview: Some(build_preview(&request.drafts)),
            });
        }

        match request.on_error {
            super::RecoveryStrategy::Rollback => self.import_rollback(&request, &ctx),
            super::RecoveryStrategy::Abort => self.import_abort(&request, &ctx),
            super::RecoveryStrategy::Skip => self.import_skip(&request, &existing, &assigned),
        }
    }

    /// All-or-nothing: any problem anywhere leaves the store untouched.
    fn import_rollback(
        &mut self,
        request: &TaskImportRequest,
        ctx: &BatchContext<'_>,
    ) -> Result<TaskImportOutcome, StoreError> {
        let errors = batch_errors(request, ctx);
        if !errors.is_empty() {
            return Ok(failure(errors));
        }
        let task_ids = self.commit_batch(&request.drafts)?;
        self.imported_outcome(task_ids, Vec::new(), Vec::new())
    }

    /// Like rollback, but reports only the first problem encountered in
    /// document order. Each entry is checked completely (fields and
    /// references) before the next one is looked at.
    fn import_abort(
        &mut self,
        request: &TaskImportRequest,
        ctx: &BatchContext<'_>,
    ) -> Result<TaskImportOutcome, StoreError> {
        let mut known: BTreeSet<&str> = ctx.existing.iter().map(|(id, _)| id.as_str()).collect();
        known.extend(ctx.assigned_ids.iter().map(String::as_str));
        for (index, draft) in request.drafts.iter().enumerate() {
            if !request.skip_validation
                && let Some(first) = validate_draft(index + 1, draft).into_iter().next()
            {
                return Ok(failure(vec![first]));
            }
            for dep in &draft.depends_on {
                if !known.contains(dep.as_str()) {
                    return Ok(failure(vec![format!(
                        "task {} ('{}'): depends_on references unknown task '{dep}'",
                        index + 1,
                        draft.display_name()
                    )]));
                }
            }
        }
        if let Some(cycle) = batch_cycle(&request.drafts, ctx) {
            return Ok(failure(vec![format!(
                "dependency cycle detected: {}",
                graph::format_cycle(&cycle)
            )]));
        }
        let task_ids = self.commit_batch(&request.drafts)?;
        self.imported_outcome(task_ids, Vec::new(), Vec::new())
    }

    /// Commits what it can, one entry per transaction, and reports the
    /// rest as skipped. References resolve against tasks that exist by
    /// the time an entry is reached; entries on a dependency cycle can
    /// never commit and are skipped up front.
    fn import_skip(
        &mut self,
        request: &TaskImportRequest,
        existing: &[(String, Vec<String>)],
        assigned: &[String],
    ) -> Result<TaskImportOutcome, StoreError> {
        let cycle = batch_cycle(
            &request.drafts,
            &BatchContext {
                existing,
                assigned_ids: assigned,
            },
        );
        let cycle_members: BTreeSet<&str> = cycle
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();

        let mut errors = Vec::new();
        let mut skipped = Vec::new();
        let mut task_ids: Vec<String> = Vec::new();
        let mut known: BTreeSet<String> = existing.iter().map(|(id, _)| id.clone()).collect();

        for (index, draft) in request.drafts.iter().enumerate() {
            let mut draft_errors = Vec::new();
            if cycle_members.contains(assigned[index].as_str()) {
                let cycle = cycle.as_deref().unwrap_or_default();
                draft_errors.push(format!(
                    "task {} ('{}'): dependency cycle detected: {}",
                    index + 1,
                    draft.display_name(),
                    graph::format_cycle(cycle)
                ));
            } else {
                if !request.skip_validation {
                    draft_errors.extend(validate_draft(index + 1, draft));
                }
                for dep in &draft.depends_on {
                    if !known.contains(dep) {
                        draft_errors.push(format!(
                            "task {} ('{}'): depends_on references unknown task '{dep}'",
                            index + 1,
                            draft.display_name()
                        ));
                    }
                }
            }
            if !draft_errors.is_empty() {
                errors.extend(draft_errors);
                skipped.push(draft.display_name().to_string());
                continue;
            }

            let now_ms = super::now_ms();
            let tx = self.conn.transaction()?;
            let seq = super::next_counter_tx(&tx, super::TASK_SEQ_COUNTER)?;
            let id = format_task_id(seq);
            insert_task_tx(&tx, &draft_to_row(draft, id.clone(), now_ms))?;
            tx.commit()?;
            known.insert(id.clone());
            task_ids.push(id);
        }

        if !task_ids.is_empty() {
            let now_ms = super::now_ms();
            let tx = self.conn.transaction()?;
            record_op_tx(
                &tx,
                now_ms,
                "task_import",
                &format!("Imported {} task(s)", task_ids.len()),
                &json!({ "task_ids": task_ids }),
            )?;
            tx.commit()?;
        }
        self.imported_outcome(task_ids, errors, skipped)
    }

    /// Inserts a validated batch inside one transaction, ordering the
    /// inserts so no task lands before its in-batch dependencies.
    /// Returned ids follow document order.
    fn commit_batch(&mut self, drafts: &[TaskDraft]) -> Result<Vec<String>, StoreError> {
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;

        let mut rows: BTreeMap<String, TaskRow> = BTreeMap::new();
        let mut task_ids = Vec::new();
        let mut batch = DependencyGraph::new();
        let mut keys: BTreeMap<String, OrderKey> = BTreeMap::new();
        for draft in drafts {
            let seq = super::next_counter_tx(&tx, super::TASK_SEQ_COUNTER)?;
            let id = format_task_id(seq);
            let row = draft_to_row(draft, id.clone(), now_ms);
            batch.add_node(&id, &draft.depends_on);
            keys.insert(id.clone(), OrderKey(vec![-row.priority.rank()]));
            rows.insert(id.clone(), row);
            task_ids.push(id);
        }

        for id in batch.topological_order(&task_ids, &keys) {
            if let Some(row) = rows.get(&id) {
                insert_task_tx(&tx, row)?;
            }
        }
        record_op_tx(
            &tx,
            now_ms,
            "task_import",
            &format!("Imported {} task(s)", task_ids.len()),
            &json!({ "task_ids": task_ids }),
        )?;
        tx.commit()?;
        Ok(task_ids)
    }

    fn imported_outcome(
        &self,
        task_ids: Vec<String>,
        errors: Vec<String>,
        skipped: Vec<String>,
    ) -> Result<TaskImportOutcome, StoreError> {
        let next_task = if task_ids.is_empty() {
            None
        } else {
            self.next_task()?.map(|task| NextTask {
                id: task.id,
                name: task.name,
                priority: task.priority.as_str().to_string(),
            })
        };
        let status = if errors.is_empty() {
            ImportStatus::Success
        } else if task_ids.is_empty() {
            ImportStatus::Error
        } else {
            ImportStatus::Partial
        };
        Ok(TaskImportOutcome {
            status,
            imported: task_ids.len(),
            task_ids,
            errors,
            skipped,
            next_task,
            tasks_to_create: None,
            preview: None,
        })
    }
}

fn batch_errors(request: &TaskImportRequest, ctx: &BatchContext<'_>) -> Vec<String> {
    if request.skip_validation {
        validate_batch_references(&request.drafts, ctx)
    } else {
        validate_batch(&request.drafts, ctx)
    }
}

fn failure(errors: Vec<String>) -> TaskImportOutcome {
    TaskImportOutcome {
        status: ImportStatus::Error,
        imported: 0,
        task_ids: Vec::new(),
        errors,
        skipped: Vec::new(),
        next_task: None,
        tasks_to_create: None,
        preview: None,
    }
}

fn build_preview(drafts: &[TaskDraft]) -> ImportPreview {
    let mut by_priority: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_estimated_hours = 0.0;
    let mut tasks_summary = Vec::new();
    for draft in drafts {
        let priority = draft.priority_or_default().as_str().to_string();
        *by_priority.entry(priority.clone()).or_insert(0) += 1;
        *by_status
            .entry(draft.status_or_default().as_str().to_string())
            .or_insert(0) += 1;
        total_estimated_hours += draft.estimated_hours.unwrap_or(0.0);
        // The summary is a teaser, not the whole document.
        if tasks_summary.len() < 5 {
            tasks_summary.push(TaskSummary {
                name: draft.display_name().to_string(),
                priority,
                estimated_hours: draft.estimated_hours,
            });
        }
    }
    ImportPreview {
        task_count: drafts.len(),
        total_estimated_hours,
        by_priority,
        by_status,
        tasks_summary,
    }
}

fn draft_to_row(draft: &TaskDraft, id: String, now_ms: i64) -> TaskRow {
    let status = draft.status_or_default();
    TaskRow {
        id,
        name: draft.display_name().to_string(),
        description: draft.description.clone(),
        status,
        priority: draft.priority_or_default(),
        depends_on: draft.depends_on.clone(),
        files_to_edit: draft.files_to_edit.clone(),
        related_kb: draft.related_kb.clone(),
        estimated_hours: draft.estimated_hours,
        actual_hours: None,
        created_at_ms: now_ms,
        started_at_ms: (status == TaskStatus::InProgress).then_some(now_ms),
        completed_at_ms: (status == TaskStatus::Completed).then_some(now_ms),
    }
}
