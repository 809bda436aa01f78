//! Output module for persisting crawl results
//!
//! This module handles:
//! - Writing the result ledger to CSV
//! - Optionally recording runs and records in SQLite
//! - Building and printing the run report

mod csv_output;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::{write_csv, CsvSink};
pub use sqlite_output::SqliteSink;
pub use stats::{print_report, RunOutcome, RunReport};
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::config::OutputConfig;
use crate::state::Record;
use std::path::Path;

/// Writes the final ledger to every configured sink
///
/// The CSV file is always written, header-only when nothing was collected.
pub fn persist(config: &OutputConfig, records: &[Record], report: &RunReport) -> OutputResult<()> {
    if records.is_empty() {
        tracing::warn!("No records scraped. Creating empty CSV file.");
    } else {
        tracing::info!(records = records.len(), "Scraped {} records. Saving to CSV...", records.len());
    }

    let csv_path = write_csv(Path::new(&config.csv_path), records, report)?;
    tracing::info!(path = %csv_path.display(), "CSV written");

    if let Some(database_path) = &config.database_path {
        let mut sink = SqliteSink::open(Path::new(database_path))?;
        sink.write_run(records, report)?;
        tracing::info!(
            path = %database_path,
            run_id = ?sink.last_run_id(),
            "Run recorded in database"
        );
    }

    Ok(())
}
