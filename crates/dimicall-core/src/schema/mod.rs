pub mod columns;
pub mod header;
pub mod mapper;
pub mod patterns;

pub use columns::Schema;
pub use header::{canonical_key, HeaderNormalizer, NormalizedHeader};
pub use mapper::{ColumnMapping, ColumnMappings, MappingConflict, MappingTarget, SchemaMapper};
pub use patterns::{match_iteration, IndexShape, IterationMatch};
