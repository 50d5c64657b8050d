#![forbid(unsafe_code)]

#[derive(Clone, Debug)]
pub struct OperationRow {
    pub seq: i64,
    pub ts_ms: i64,
    pub operation_type: String,
    pub description: String,
    pub operation_data_json: String,
    pub undone: bool,
}

#[derive(Clone, Debug)]
pub struct UndoOutcome {
    pub seq: i64,
    pub operation_type: String,
    pub description: String,
    pub details: String,
}
