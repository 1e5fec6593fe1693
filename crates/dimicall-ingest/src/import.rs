use crate::delimited::DelimitedSource;
use crate::error::{IngestError, Result};
use crate::format::{FormatDetector, SizeLimits, SourceKind, Strategy};
use crate::reader::ChunkedRecordReader;
use crate::report::{ImportAggregator, ImportResult, MappingInfo};
use crate::source::{RecordSource, RowBatch};
use crate::workbook::WorkbookSource;
use dimicall_core::{
    ColumnMappings, Contact, HeaderNormalizer, MappingTarget, NormalizeOptions,
    RecordNormalizer, Schema, SchemaMapper,
};
use std::path::Path;

/// Receives accepted contacts one chunk at a time.
pub trait ContactSink {
    fn accept(&mut self, contacts: Vec<Contact>) -> Result<()>;
}

impl ContactSink for Vec<Contact> {
    fn accept(&mut self, mut contacts: Vec<Contact>) -> Result<()> {
        self.append(&mut contacts);
        Ok(())
    }
}

/// Counts contacts without keeping them, for dry runs.
#[derive(Debug, Default)]
pub struct DiscardSink {
    pub seen: usize,
}

impl ContactSink for DiscardSink {
    fn accept(&mut self, contacts: Vec<Contact>) -> Result<()> {
        self.seen += contacts.len();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub limits: SizeLimits,
    pub excluded_columns: Vec<String>,
    pub synonyms: Vec<(String, String)>,
    /// Operator choices applied after automatic mapping, in order.
    pub overrides: Vec<(String, MappingTarget)>,
    pub normalize: NormalizeOptions,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            limits: SizeLimits::default(),
            excluded_columns: vec!["Nu".to_string()],
            synonyms: Vec::new(),
            overrides: Vec::new(),
            normalize: NormalizeOptions::default(),
        }
    }
}

impl ImportOptions {
    pub fn mapper(&self) -> SchemaMapper {
        let (headers, rejected) =
            HeaderNormalizer::new().with_synonyms(self.synonyms.iter().map(|(s, t)| (s, t)));
        for target in rejected {
            tracing::warn!(target = %target, "ignoring synonym for unknown header key");
        }
        SchemaMapper::new(headers).with_excluded(&self.excluded_columns)
    }
}

/// Mapping for a schema after automatic passes and operator overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPlan {
    pub mappings: ColumnMappings,
    pub info: MappingInfo,
}

pub fn plan_mapping(schema: &Schema, options: &ImportOptions) -> Result<MappingPlan> {
    let mapper = options.mapper();
    let mut mappings = mapper.map(schema);
    for (column, target) in &options.overrides {
        mapper.apply_override(&mut mappings, schema, column, *target)?;
    }
    let info = MappingInfo::new(schema, &mappings);
    Ok(MappingPlan { mappings, info })
}

/// Reads only the header of a file and returns its mapping.
pub fn preview_path(path: &Path, options: &ImportOptions) -> Result<MappingPlan> {
    let detector = FormatDetector::new(options.limits);
    let detection = detector.inspect_path(path)?;
    let schema = match detection.kind {
        SourceKind::Delimited => {
            Schema::discover(DelimitedSource::open(path, detection.delimiter)?.columns())
        }
        SourceKind::Workbook => Schema::discover(WorkbookSource::open(path)?.columns()),
    };
    plan_mapping(&schema, options)
}

pub fn import_path(
    path: &Path,
    options: &ImportOptions,
    sink: &mut dyn ContactSink,
) -> Result<ImportResult> {
    let detector = FormatDetector::new(options.limits);
    let detection = detector.inspect_path(path)?;
    tracing::info!(path = %path.display(), size = detection.size, "importing contacts");
    match detection.kind {
        SourceKind::Delimited => {
            let source = DelimitedSource::open(path, detection.delimiter)?;
            import_source(source, detection.strategy, options, sink)
        }
        SourceKind::Workbook => {
            let source = WorkbookSource::open(path)?;
            import_source(source, detection.strategy, options, sink)
        }
    }
}

/// Imports rows pulled from an external store. Rows are processed in chunks
/// of `small_chunk_rows`.
pub fn import_rows(
    batch: RowBatch,
    options: &ImportOptions,
    sink: &mut dyn ContactSink,
) -> Result<ImportResult> {
    let strategy = Strategy::ChunkedSmall {
        rows: options.limits.small_chunk_rows,
    };
    import_source(batch, strategy, options, sink)
}

/// Runs reader, mapper, normalizer and aggregator over one source.
///
/// Row-level problems end up in the returned result. Errors are returned for
/// invalid overrides and for sink failures; a decoding error stops the run and
/// is reported as an incomplete result.
pub fn import_source<S: RecordSource>(
    source: S,
    strategy: Strategy,
    options: &ImportOptions,
    sink: &mut dyn ContactSink,
) -> Result<ImportResult> {
    let reader = ChunkedRecordReader::new(source, strategy);
    let schema = reader.schema().clone();
    let plan = plan_mapping(&schema, options)?;

    if let Err(err) = plan.mappings.require_fields() {
        tracing::warn!(%err, "required fields not mapped; manual mapping needed");
        return Ok(ImportAggregator::escalate(plan.info));
    }

    let normalizer = RecordNormalizer::new(&schema, &plan.mappings, options.normalize);
    let mut aggregator = ImportAggregator::new(plan.info);
    aggregator.conflicts(plan.mappings.conflicts());

    for chunk in reader {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(IngestError::Format { row, message }) => {
                tracing::warn!(row, %message, "stopping import at unreadable row");
                aggregator.abort(row, message);
                break;
            }
            Err(err) => return Err(err),
        };

        let mut accepted = Vec::with_capacity(chunk.records.len());
        for record in &chunk.records {
            match normalizer.normalize(record) {
                Ok(row) => {
                    aggregator.accept(row.warnings);
                    accepted.push(row.contact);
                }
                Err(error) => aggregator.reject(error),
            }
        }
        tracing::debug!(
            chunk = chunk.index,
            rows = chunk.records.len(),
            accepted = aggregator.accepted(),
            rejected = aggregator.rejected(),
            "chunk processed"
        );
        if !accepted.is_empty() {
            sink.accept(accepted)?;
        }
    }

    let result = aggregator.finish();
    tracing::info!(
        accepted = result.accepted_count,
        rejected = result.rejected_count,
        needs_mapping = result.needs_mapping,
        "import finished"
    );
    Ok(result)
}
