use crate::error::{IngestError, Result};
use crate::format::Delimiter;
use crate::source::{RecordSource, SourceRow};
use dimicall_core::RawValue;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// CSV/TSV rows streamed with the `csv` crate. Rows may be shorter or longer
/// than the header.
pub struct DelimitedSource<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    columns: Vec<String>,
    next_row: u64,
}

impl DelimitedSource<File> {
    pub fn open(path: &Path, delimiter: Delimiter) -> Result<Self> {
        Self::from_reader(File::open(path)?, delimiter)
    }
}

impl<R: Read> DelimitedSource<R> {
    pub fn from_reader(reader: R, delimiter: Delimiter) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let columns: Vec<String> = reader
            .headers()
            .map_err(|err| IngestError::Format {
                row: 0,
                message: format!("unreadable header: {err}"),
            })?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        if columns.iter().all(|column| column.is_empty()) {
            return Err(IngestError::MissingHeader);
        }
        Ok(Self {
            records: reader.into_records(),
            columns,
            next_row: 0,
        })
    }
}

impl<R: Read> RecordSource for DelimitedSource<R> {
    fn source_name(&self) -> &'static str {
        "delimited"
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<SourceRow>> {
        let record = self.records.next()?;
        let row = self.next_row;
        self.next_row += 1;
        Some(
            record
                .map(|record| SourceRow::Positional(record.iter().map(RawValue::from).collect()))
                .map_err(|err| IngestError::Format {
                    row,
                    message: err.to_string(),
                }),
        )
    }
}
