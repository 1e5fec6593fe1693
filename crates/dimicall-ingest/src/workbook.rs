use crate::error::{IngestError, Result};
use crate::source::{RecordSource, SourceRow};
use calamine::{open_workbook_auto, Data, Range, Reader};
use dimicall_core::RawValue;
use std::path::Path;

/// First sheet of an xlsx/xls/ods workbook. The sheet is decoded up front
/// by calamine; rows are handed out one at a time after that.
pub struct WorkbookSource {
    range: Range<Data>,
    columns: Vec<String>,
    cursor: usize,
}

impl WorkbookSource {
    pub fn open(path: &Path) -> Result<Self> {
        let mut workbook =
            open_workbook_auto(path).map_err(|err| IngestError::Workbook(err.to_string()))?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(IngestError::MissingHeader)?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|err| IngestError::Workbook(err.to_string()))?;
        tracing::debug!(path = %path.display(), sheet = %sheet, size = ?range.get_size(), "opened workbook");
        Self::from_range(range)
    }

    pub fn from_range(range: Range<Data>) -> Result<Self> {
        let columns: Vec<String> = range
            .rows()
            .next()
            .ok_or(IngestError::MissingHeader)?
            .iter()
            .map(|cell| cell_value(cell).as_text().map(|s| s.into_owned()).unwrap_or_default())
            .collect();
        if columns.iter().all(|column| column.is_empty()) {
            return Err(IngestError::MissingHeader);
        }
        Ok(Self {
            range,
            columns,
            cursor: 1,
        })
    }
}

impl RecordSource for WorkbookSource {
    fn source_name(&self) -> &'static str {
        "workbook"
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<SourceRow>> {
        let (height, width) = self.range.get_size();
        if self.cursor >= height {
            return None;
        }
        let row = (0..width)
            .map(|col| {
                self.range
                    .get((self.cursor, col))
                    .map(cell_value)
                    .unwrap_or(RawValue::Null)
            })
            .collect();
        self.cursor += 1;
        Some(Ok(SourceRow::Positional(row)))
    }
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Null,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Float(f) => RawValue::Number(*f),
        Data::Bool(b) => RawValue::Text(b.to_string()),
        Data::DateTime(dt) => RawValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
        Data::Error(err) => {
            tracing::debug!(?err, "spreadsheet error cell read as empty");
            RawValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkbookSource;
    use crate::error::IngestError;
    use crate::source::{RecordSource, SourceRow};
    use calamine::{Data, Range};
    use dimicall_core::RawValue;

    fn sheet(rows: &[&[Data]]) -> Range<Data> {
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, width as u32 - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    #[test]
    fn header_and_typed_cells() {
        let range = sheet(&[
            &[Data::String("Prénom".into()), Data::String("Tel".into())],
            &[Data::String("Jean".into()), Data::Int(612345678)],
        ]);
        let mut source = WorkbookSource::from_range(range).unwrap();
        assert_eq!(source.columns(), ["Prénom", "Tel"]);
        assert_eq!(
            source.next_row().unwrap().unwrap(),
            SourceRow::Positional(vec![
                RawValue::from("Jean"),
                RawValue::Number(612345678.0)
            ])
        );
        assert!(source.next_row().is_none());
    }

    #[test]
    fn long_sheet_reads_every_row_in_order() {
        let rows = 20_000u32;
        let mut range = Range::new((0, 0), (rows, 1));
        range.set_value((0, 0), Data::String("UID".into()));
        range.set_value((0, 1), Data::String("Nom".into()));
        for r in 1..=rows {
            range.set_value((r, 0), Data::Int(r as i64));
            range.set_value((r, 1), Data::String(format!("n{r}")));
        }
        let mut source = WorkbookSource::from_range(range).unwrap();
        let mut seen = 0u32;
        while let Some(row) = source.next_row() {
            seen += 1;
            assert_eq!(
                row.unwrap(),
                SourceRow::Positional(vec![
                    RawValue::Number(seen as f64),
                    RawValue::Text(format!("n{seen}"))
                ])
            );
        }
        assert_eq!(seen, rows);
    }

    #[test]
    fn blank_header_row_is_rejected() {
        let range = sheet(&[&[Data::Empty, Data::Empty], &[Data::Int(1), Data::Int(2)]]);
        assert!(matches!(
            WorkbookSource::from_range(range),
            Err(IngestError::MissingHeader)
        ));
    }
}
