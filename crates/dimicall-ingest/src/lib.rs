pub mod delimited;
pub mod error;
pub mod export;
pub mod format;
pub mod import;
pub mod reader;
pub mod report;
pub mod source;
pub mod workbook;

pub use error::{IngestError, Result};
pub use format::{Delimiter, Detection, FormatDetector, SizeLimits, SourceKind, Strategy};
pub use import::{
    import_path, import_rows, import_source, plan_mapping, preview_path, ContactSink,
    DiscardSink, ImportOptions, MappingPlan,
};
pub use reader::{ChunkedRecordReader, RecordChunk};
pub use report::{ImportAggregator, ImportResult, MappingInfo};
pub use source::{RecordSource, RowBatch, SourceRow};
