use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::ReportError;
use crate::runner::PublishReport;

pub const REPORT_HEADER: [&str; 4] = ["Row", "Searched_PK", "Outcome", "Detail"];

/// Write `report` as CSV, one line per staged row.
pub fn write_report<W: io::Write>(writer: W, report: &PublishReport) -> Result<W, ReportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(REPORT_HEADER)?;
    for entry in &report.entries {
        writer.write_record([
            entry.row.to_string().as_str(),
            entry.searched_key.as_str(),
            entry.outcome.label(),
            entry.outcome.detail().as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Flush(e.into_error()))
}

pub fn write_report_file(path: impl AsRef<Path>, report: &PublishReport) -> Result<(), ReportError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|error| ReportError::Create {
        path: path.display().to_string(),
        error,
    })?;
    write_report(file, report)?;
    Ok(())
}
