use crate::domain::field::CanonicalField;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("required fields are not mapped: {}", join_fields(.0))]
    MissingRequiredFields(Vec<CanonicalField>),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column cannot be mapped: {0}")]
    ExcludedColumn(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("maximum {0} calls per contact")]
    SlotsExhausted(usize),
    #[error("invalid call slot: {0}")]
    InvalidSlot(u8),
    #[error("call history changed since it was read (read revision {expected}, now {found})")]
    StaleSnapshot { expected: u64, found: u64 },
    #[error("a call needs at least a date or a status")]
    EmptyCallRecord,
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}
