use crate::Result;
use dimicall_core::RawValue;

/// One row as handed over by a source: positional cells from a file, or
/// column/value pairs from an external store.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    Positional(Vec<RawValue>),
    Keyed(Vec<(String, RawValue)>),
}

pub trait RecordSource {
    fn source_name(&self) -> &'static str;
    /// Column names as they appear in the source, captured once up front.
    fn columns(&self) -> &[String];
    fn next_row(&mut self) -> Option<Result<SourceRow>>;
}

/// Rows fetched from an external store, along with the column names observed
/// on the first page of the fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Vec<(String, RawValue)>>,
}

impl RowBatch {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Default::default(),
        }
    }

    pub fn push_row<I, K>(&mut self, row: I)
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        self.rows
            .push_back(row.into_iter().map(|(k, v)| (k.into(), v)).collect());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RecordSource for RowBatch {
    fn source_name(&self) -> &'static str {
        "rows"
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<SourceRow>> {
        self.rows.pop_front().map(|row| Ok(SourceRow::Keyed(row)))
    }
}
