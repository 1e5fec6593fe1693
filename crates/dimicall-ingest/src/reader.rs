use crate::error::{IngestError, Result};
use crate::format::Strategy;
use crate::source::{RecordSource, SourceRow};
use dimicall_core::{RawRecord, Schema};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordChunk {
    pub index: usize,
    pub records: Vec<RawRecord>,
}

/// Suspension point offered to the host between two chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pacer {
    None,
    Yield,
    Sleep(Duration),
}

impl Pacer {
    fn for_strategy(strategy: &Strategy) -> Self {
        match strategy {
            Strategy::Direct => Pacer::None,
            Strategy::ChunkedSmall { .. } => Pacer::Yield,
            Strategy::ChunkedLarge { pause, .. } => Pacer::Sleep(*pause),
        }
    }

    fn pause(self) {
        match self {
            Pacer::None => {}
            Pacer::Yield => thread::yield_now(),
            Pacer::Sleep(duration) => thread::sleep(duration),
        }
    }
}

/// Pumps a source into chunks of raw records.
///
/// The only state carried across chunks is the schema, captured once from the
/// source's columns, and the row counter. A decoding error ends the stream:
/// rows already buffered are still delivered, then the error, then `None`.
/// Restarting means opening the source again.
pub struct ChunkedRecordReader<S> {
    source: S,
    schema: Arc<Schema>,
    chunk_rows: Option<usize>,
    pacer: Pacer,
    rows_read: u64,
    chunks: usize,
    pending_error: Option<IngestError>,
    finished: bool,
}

impl<S: RecordSource> ChunkedRecordReader<S> {
    pub fn new(source: S, strategy: Strategy) -> Self {
        let schema = Arc::new(Schema::discover(source.columns()));
        tracing::debug!(
            source = source.source_name(),
            columns = schema.len(),
            ?strategy,
            "reading records"
        );
        Self {
            source,
            schema,
            chunk_rows: strategy.chunk_rows().map(|rows| rows.max(1)),
            pacer: Pacer::for_strategy(&strategy),
            rows_read: 0,
            chunks: 0,
            pending_error: None,
            finished: false,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Data rows pulled from the source so far, blank ones included.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn to_record(&self, row: u64, source_row: SourceRow) -> RawRecord {
        let schema = Arc::clone(&self.schema);
        match source_row {
            SourceRow::Positional(values) => RawRecord::from_values(schema, row, values),
            SourceRow::Keyed(pairs) => RawRecord::from_pairs(schema, row, pairs),
        }
    }
}

impl<S: RecordSource> Iterator for ChunkedRecordReader<S> {
    type Item = Result<RecordChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        if self.finished {
            return None;
        }
        if self.chunks > 0 {
            self.pacer.pause();
        }

        let mut records = Vec::with_capacity(self.chunk_rows.unwrap_or(0));
        while self.chunk_rows.map_or(true, |limit| records.len() < limit) {
            match self.source.next_row() {
                None => {
                    self.finished = true;
                    break;
                }
                Some(Err(err)) => {
                    self.finished = true;
                    if records.is_empty() {
                        return Some(Err(err));
                    }
                    self.pending_error = Some(err);
                    break;
                }
                Some(Ok(source_row)) => {
                    let row = self.rows_read;
                    self.rows_read += 1;
                    let record = self.to_record(row, source_row);
                    if !record.is_blank() {
                        records.push(record);
                    }
                }
            }
        }

        if records.is_empty() && self.finished {
            return self.pending_error.take().map(Err);
        }
        let chunk = RecordChunk {
            index: self.chunks,
            records,
        };
        self.chunks += 1;
        Some(Ok(chunk))
    }
}
