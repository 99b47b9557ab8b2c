//! SQL statement execution.
//!
//! Owns the submit → poll → assemble lifecycle of a single statement, plus
//! warehouse selection and progress reporting.

pub mod executor;
pub mod progress;
pub mod warehouse;

pub use executor::{ExecutionSettings, ResultSet, StatementExecutor, StatementRequest};
pub use progress::{ChannelProgressSink, ProgressEvent, ProgressSink, SinkError};
pub use warehouse::resolve_warehouse;
