#![forbid(unsafe_code)]

use td_core::graph::format_cycle;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    DuplicateId { id: String },
    NotFound { id: String },
    DependencyCycle { cycle: Vec<String> },
    StaleOperation { seq: i64, reason: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::DuplicateId { id } => write!(f, "duplicate task id: {id}"),
            Self::NotFound { id } => write!(f, "task not found: {id}"),
            Self::DependencyCycle { cycle } => {
                write!(f, "dependency cycle: {}", format_cycle(cycle))
            }
            Self::StaleOperation { seq, reason } => {
                write!(f, "stale operation (seq={seq}): {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
