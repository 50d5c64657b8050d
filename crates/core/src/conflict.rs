#![forbid(unsafe_code)]

use crate::model::TaskPriority;
use std::collections::BTreeSet;

/// Risk banding cutpoints: a score of 0.7 or above is high, 0.4 or
/// above is medium, anything below is low.
pub const HIGH_RISK_CUTOFF: f64 = 0.7;
pub const MEDIUM_RISK_CUTOFF: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

pub fn risk_level(score: f64) -> RiskLevel {
    if score >= HIGH_RISK_CUTOFF {
        RiskLevel::High
    } else if score >= MEDIUM_RISK_CUTOFF {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Derived file-overlap conflict between two tasks. Computed on demand,
/// never persisted.
#[derive(Clone, Debug)]
pub struct ConflictRecord {
    pub task_a_id: String,
    pub task_b_id: String,
    pub conflict_type: &'static str,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub overlapping_files: Vec<String>,
    pub details: String,
    pub recommendation: String,
}

/// The slice of a task that conflict scoring needs.
#[derive(Clone, Copy, Debug)]
pub struct TaskFileSet<'a> {
    pub id: &'a str,
    pub priority: TaskPriority,
    pub files: &'a [String],
}

/// Overlap risk in [0, 1]: `0.7·r + 0.3·s`, capped at 1, where
/// `r = overlap / min(|a|, |b|)` and `s = overlap / (overlap + 2)`.
/// Both terms grow with the overlap ratio and with the absolute number
/// of shared files, so the score is monotonic in each while the other is
/// held fixed.
pub fn risk_score(overlap: usize, files_a: usize, files_b: usize) -> f64 {
    if overlap == 0 || files_a == 0 || files_b == 0 {
        return 0.0;
    }
    let smaller = files_a.min(files_b) as f64;
    let ratio = (overlap as f64 / smaller).min(1.0);
    let saturation = overlap as f64 / (overlap as f64 + 2.0);
    (0.7 * ratio + 0.3 * saturation).min(1.0)
}

pub fn overlapping_files(files_a: &[String], files_b: &[String]) -> Vec<String> {
    let b: BTreeSet<&str> = files_b.iter().map(String::as_str).collect();
    let shared: BTreeSet<&str> = files_a
        .iter()
        .map(String::as_str)
        .filter(|file| b.contains(*file))
        .collect();
    shared.into_iter().map(String::from).collect()
}

/// Builds the conflict record for two tasks, or `None` when their file
/// sets do not intersect.
pub fn detect(a: &TaskFileSet<'_>, b: &TaskFileSet<'_>) -> Option<ConflictRecord> {
    let shared = overlapping_files(a.files, b.files);
    if shared.is_empty() {
        return None;
    }

    let score = risk_score(shared.len(), a.files.len(), b.files.len());
    let level = risk_level(score);

    let details = format!(
        "Both tasks edit: {}. {} touches {} file(s), {} touches {} file(s)",
        shared.join(", "),
        a.id,
        a.files.len(),
        b.id,
        b.files.len()
    );

    // Sequence the higher-priority task first; ties defer to the task
    // already under inspection.
    let (first, second) = if b.priority.rank() > a.priority.rank() {
        (b.id, a.id)
    } else {
        (a.id, b.id)
    };
    let recommendation = format!(
        "Complete {first} before starting {second} to avoid conflicting edits to {} shared file(s)",
        shared.len()
    );

    Some(ConflictRecord {
        task_a_id: a.id.to_string(),
        task_b_id: b.id.to_string(),
        conflict_type: "file_overlap",
        risk_level: level,
        risk_score: score,
        overlapping_files: shared,
        details,
        recommendation,
    })
}
