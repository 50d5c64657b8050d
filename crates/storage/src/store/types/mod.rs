#![forbid(unsafe_code)]

mod ops_history;
mod tasks;

pub use ops_history::*;
pub use tasks::*;
