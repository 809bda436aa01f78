//! CSV sink: one `title,url` row per record

use crate::output::stats::RunReport;
use crate::output::traits::{OutputResult, RecordSink};
use crate::state::Record;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the ledger as CSV
///
/// The header is written explicitly so an empty ledger still yields a header-only file.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<File> {
    /// Creates (or truncates) the CSV file at `path`, creating parent directories
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
        }
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::output::OutputError::Io(e.into_error()))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_run(&mut self, records: &[Record], _report: &RunReport) -> OutputResult<()> {
        self.writer.write_record(Record::HEADERS)?;
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes `records` to a CSV file at `path`
pub fn write_csv(path: &Path, records: &[Record], report: &RunReport) -> OutputResult<PathBuf> {
    let mut sink = CsvSink::create(path)?;
    sink.write_run(records, report)?;
    Ok(path.to_path_buf())
}
