#![forbid(unsafe_code)]

pub mod conflict;
pub mod graph;
pub mod validate;

pub mod ids {
    /// Task ids are minted from a persistent counter and rendered as
    /// `TASK-<seq>` with at least three digits (`TASK-001`, `TASK-1000`).
    pub fn format_task_id(seq: i64) -> String {
        format!("TASK-{seq:03}")
    }

    pub fn parse_task_seq(value: &str) -> Option<i64> {
        let digits = value.trim().strip_prefix("TASK-")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok()
    }

    pub fn is_task_id(value: &str) -> bool {
        parse_task_seq(value).is_some()
    }
}

pub mod model {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TaskStatus {
        Pending,
        InProgress,
        Completed,
        Blocked,
    }

    impl TaskStatus {
        pub const ALL: &[TaskStatus] = &[
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                TaskStatus::Pending => "pending",
                TaskStatus::InProgress => "in_progress",
                TaskStatus::Completed => "completed",
                TaskStatus::Blocked => "blocked",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            Self::ALL
                .iter()
                .copied()
                .find(|status| status.as_str() == value.trim())
        }

        pub fn supported_values() -> String {
            Self::ALL
                .iter()
                .map(|status| status.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum TaskPriority {
        Low,
        Medium,
        High,
        Critical,
    }

    impl TaskPriority {
        pub const ALL: &[TaskPriority] = &[
            TaskPriority::Low,
            TaskPriority::Medium,
            TaskPriority::High,
            TaskPriority::Critical,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                TaskPriority::Low => "low",
                TaskPriority::Medium => "medium",
                TaskPriority::High => "high",
                TaskPriority::Critical => "critical",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            Self::ALL
                .iter()
                .copied()
                .find(|priority| priority.as_str() == value.trim())
        }

        /// Ordering rank: low=0 .. critical=3.
        pub fn rank(self) -> i64 {
            match self {
                TaskPriority::Low => 0,
                TaskPriority::Medium => 1,
                TaskPriority::High => 2,
                TaskPriority::Critical => 3,
            }
        }

        pub fn supported_values() -> String {
            Self::ALL
                .iter()
                .map(|priority| priority.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// Explicit partial patch for task updates. `None` means "leave the
    /// field alone"; the nested `Option` distinguishes "clear" from
    /// "set" for nullable fields.
    #[derive(Clone, Debug, Default)]
    pub struct TaskPatch {
        pub name: Option<String>,
        pub description: Option<Option<String>>,
        pub status: Option<TaskStatus>,
        pub priority: Option<TaskPriority>,
        pub estimated_hours: Option<Option<f64>>,
        pub actual_hours: Option<Option<f64>>,
    }

    impl TaskPatch {
        pub fn is_empty(&self) -> bool {
            self.name.is_none()
                && self.description.is_none()
                && self.status.is_none()
                && self.priority.is_none()
                && self.estimated_hours.is_none()
                && self.actual_hours.is_none()
        }
    }
}
