//! Annotated-CSV file sink.
//!
//! Appends rows to `<kind>.csv`. On first write to an empty file, four
//! header rows are emitted following the time-series annotated CSV
//! convention: `#datatype`, `#group`, `#default` annotation rows plus the
//! plain column-name header. Every later export appends data rows only.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::telemetry::{Stamped, Telemetry, PROVENANCE_COLUMNS};

use super::ExportError;

/// Quote a cell when it contains a delimiter, quote or newline.
fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Annotated-CSV file sink.
#[derive(Debug)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append the batch to the kind's `.csv` file, writing the annotation
    /// header first when the file is empty.
    pub fn export<T: Telemetry>(&self, records: &[Stamped<T>]) -> Result<(), ExportError> {
        if records.is_empty() {
            return Err(ExportError::EmptyBatch);
        }

        let path = self.dir.join(format!("{}.csv", T::KIND));
        let io_err = |source| ExportError::Io {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(&io_err)?;
        let fresh = file.metadata().map_err(&io_err)?.len() == 0;

        let mut out = String::new();
        if fresh {
            out.push_str(&header_rows::<T>());
        }
        for record in records {
            out.push_str(&data_row(record));
            out.push('\n');
        }

        file.write_all(out.as_bytes()).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })
    }
}

/// Full column set: provenance columns first, then the payload descriptor.
fn columns<T: Telemetry>() -> Vec<&'static str> {
    let mut all: Vec<&'static str> = PROVENANCE_COLUMNS.to_vec();
    all.extend_from_slice(T::columns());
    all
}

/// The four header rows for an empty file.
///
/// The timestamp column is typed `dateTime:RFC3339`, everything else
/// `double`; the provenance identity columns form the group key.
fn header_rows<T: Telemetry>() -> String {
    let all = columns::<T>();

    let datatype: Vec<&str> = all
        .iter()
        .map(|&c| if c == "timestamp" { "dateTime:RFC3339" } else { "double" })
        .collect();
    let group: Vec<&str> = all
        .iter()
        .map(|&c| {
            if matches!(c, "site" | "source" | "name") {
                "true"
            } else {
                "false"
            }
        })
        .collect();
    let default: Vec<&str> = all.iter().map(|_| "").collect();

    format!(
        "#datatype,{}\n#group,{}\n#default,{}\n{}\n",
        datatype.join(","),
        group.join(","),
        default.join(","),
        all.join(",")
    )
}

/// One data row: RFC3339 timestamp, provenance, then payload values through
/// their generic string conversion.
fn data_row<T: Telemetry>(record: &Stamped<T>) -> String {
    let mut cells = vec![
        record.timestamp.to_rfc3339(),
        record.site.to_string(),
        record.source.to_string(),
        escape_cell(&record.name),
    ];
    cells.extend(
        record
            .record()
            .values()
            .iter()
            .map(|value| escape_cell(&value.to_string())),
    );
    cells.join(",")
}
