//! Record sink trait and output errors

use crate::output::stats::RunReport;
use crate::state::Record;
use thiserror::Error;

/// Errors that can occur while persisting results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the final result ledger
///
/// Sinks receive the whole ledger once, at the end of the run, in discovery order.
/// An empty ledger is valid and must still produce a well-formed artifact.
pub trait RecordSink {
    /// Writes every record and the run report
    fn write_run(&mut self, records: &[Record], report: &RunReport) -> OutputResult<()>;
}
