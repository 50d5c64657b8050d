#![forbid(unsafe_code)]

use crate::graph::{self, DependencyGraph};
use crate::model::{TaskPriority, TaskStatus};
use std::collections::{BTreeMap, BTreeSet};

/// One parsed entry of an import batch, before any id has been assigned.
/// Enum-valued fields stay raw strings here so validation can report the
/// offending value instead of failing at parse time.
#[derive(Clone, Debug, Default)]
pub struct TaskDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub depends_on: Vec<String>,
    pub files_to_edit: Vec<String>,
    pub related_kb: Vec<String>,
    pub estimated_hours: Option<f64>,
}

impl TaskDraft {
    /// Name used in error and skip reports; drafts without a usable name
    /// show up as "unnamed".
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "unnamed",
        }
    }

    pub fn status_or_default(&self) -> TaskStatus {
        self.status
            .as_deref()
            .and_then(TaskStatus::parse)
            .unwrap_or(TaskStatus::Pending)
    }

    pub fn priority_or_default(&self) -> TaskPriority {
        self.priority
            .as_deref()
            .and_then(TaskPriority::parse)
            .unwrap_or(TaskPriority::Medium)
    }
}

/// Field-level checks for a single draft. `position` is 1-based (it
/// refers to the entry's place in the submitted document). Returns
/// human-readable problems; an empty list means the draft is valid on
/// its own.
pub fn validate_draft(position: usize, draft: &TaskDraft) -> Vec<String> {
    let mut errors = Vec::new();
    let label = draft.display_name();

    match draft.name.as_deref() {
        Some(name) if !name.trim().is_empty() => {}
        _ => errors.push(format!(
            "task {position}: 'name' is required and must be non-empty"
        )),
    }

    if let Some(raw) = draft.priority.as_deref()
        && TaskPriority::parse(raw).is_none()
    {
        errors.push(format!(
            "task {position} ('{label}'): invalid priority '{raw}' (expected one of: {})",
            TaskPriority::supported_values()
        ));
    }

    if let Some(raw) = draft.status.as_deref()
        && TaskStatus::parse(raw).is_none()
    {
        errors.push(format!(
            "task {position} ('{label}'): invalid status '{raw}' (expected one of: {})",
            TaskStatus::supported_values()
        ));
    }

    if let Some(hours) = draft.estimated_hours
        && !(hours.is_finite() && hours >= 0.0)
    {
        errors.push(format!(
            "task {position} ('{label}'): estimated_hours must be a non-negative number"
        ));
    }

    errors
}

/// Context for whole-batch validation: the committed task table plus the
/// ids the batch entries would receive on commit (parallel to the draft
/// list).
pub struct BatchContext<'a> {
    pub existing: &'a [(String, Vec<String>)],
    pub assigned_ids: &'a [String],
}

/// Whole-batch validation: every per-draft check, duplicate names within
/// the batch, dangling dependency references, and a cycle check over the
/// committed graph plus the candidate batch. Errors are data; callers
/// decide what a non-empty list means under their recovery strategy.
pub fn validate_batch(drafts: &[TaskDraft], ctx: &BatchContext<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    for (index, draft) in drafts.iter().enumerate() {
        errors.extend(validate_draft(index + 1, draft));
    }

    let mut seen_names: BTreeMap<&str, usize> = BTreeMap::new();
    for (index, draft) in drafts.iter().enumerate() {
        let Some(name) = draft.name.as_deref() else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(first) = seen_names.insert(name, index + 1) {
            errors.push(format!(
                "task {} ('{name}'): duplicate name in batch (also task {first})",
                index + 1
            ));
        }
    }

    errors.extend(validate_batch_references(drafts, ctx));
    errors
}

/// Referential-integrity subset of batch validation: dangling
/// `depends_on` ids and the cycle check. Enforced even when field-level
/// validation is skipped, because the committed graph must stay a DAG.
pub fn validate_batch_references(drafts: &[TaskDraft], ctx: &BatchContext<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    let mut known: BTreeSet<&str> = ctx.existing.iter().map(|(id, _)| id.as_str()).collect();
    known.extend(ctx.assigned_ids.iter().map(String::as_str));
    for (index, draft) in drafts.iter().enumerate() {
        for dep in &draft.depends_on {
            if !known.contains(dep.as_str()) {
                errors.push(format!(
                    "task {} ('{}'): depends_on references unknown task '{dep}'",
                    index + 1,
                    draft.display_name()
                ));
            }
        }
    }

    if let Some(cycle) = batch_cycle(drafts, ctx) {
        errors.push(format!(
            "dependency cycle detected: {}",
            graph::format_cycle(&cycle)
        ));
    }

    errors
}

/// Cycle check over existing tasks plus the candidate batch under its
/// would-be ids.
pub fn batch_cycle(drafts: &[TaskDraft], ctx: &BatchContext<'_>) -> Option<Vec<String>> {
    let mut graph = DependencyGraph::new();
    for (id, depends_on) in ctx.existing {
        graph.add_node(id.as_str(), depends_on);
    }
    for (index, draft) in drafts.iter().enumerate() {
        let Some(id) = ctx.assigned_ids.get(index) else {
            continue;
        };
        graph.add_node(id.as_str(), &draft.depends_on);
    }
    graph.detect_cycle()
}
