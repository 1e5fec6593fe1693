pub mod domain;
pub mod dto;
pub mod error;
pub mod normalize;
pub mod record;
pub mod schema;
pub mod text;
pub mod time;

pub use domain::*;
pub use dto::*;
pub use error::CoreError;
pub use normalize::{
    NormalizeOptions, NormalizedRow, RecordNormalizer, RowError, RowErrorKind, RowWarning,
};
pub use record::{RawRecord, RawValue};
pub use schema::*;
