use dimicall_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// The source is larger than the configured hard limit; nothing was parsed.
    #[error("file too large: {size} bytes (limit {limit} bytes)")]
    SizeLimitExceeded { size: u64, limit: u64 },
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(PathBuf),
    /// Decoding stopped at a data row (0-based).
    #[error("row {row}: {message}")]
    Format { row: u64, message: String },
    #[error("no header row found")]
    MissingHeader,
    #[error("workbook error: {0}")]
    Workbook(String),
    #[error("contact sink failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, IngestError>;
