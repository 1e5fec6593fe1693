use dimicall_core::{CanonicalField, ColumnMappings, MappingConflict, RowError, RowWarning, Schema};
use serde::Serialize;

/// Row errors kept in a report; the rest are only counted.
pub const MAX_REPORTED_ERRORS: usize = 500;

/// What a remapping step needs to show an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInfo {
    pub original_headers: Vec<String>,
    pub unmapped_headers: Vec<String>,
    pub required_fields: Vec<CanonicalField>,
}

impl MappingInfo {
    pub fn new(schema: &Schema, mappings: &ColumnMappings) -> Self {
        Self {
            original_headers: schema.columns().to_vec(),
            unmapped_headers: mappings
                .unmapped_columns()
                .into_iter()
                .map(str::to_string)
                .collect(),
            required_fields: CanonicalField::REQUIRED.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub accepted_count: u64,
    pub rejected_count: u64,
    pub needs_mapping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_info: Option<MappingInfo>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
    /// False when a decoding error stopped the source before its end.
    pub complete: bool,
}

/// Collects row outcomes across the chunks of one import run.
#[derive(Debug)]
pub struct ImportAggregator {
    mapping_info: MappingInfo,
    accepted: u64,
    rejected: u64,
    missing_required_only: bool,
    errors: Vec<RowError>,
    warnings: Vec<String>,
    complete: bool,
}

impl ImportAggregator {
    pub fn new(mapping_info: MappingInfo) -> Self {
        Self {
            mapping_info,
            accepted: 0,
            rejected: 0,
            missing_required_only: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            complete: true,
        }
    }

    /// Result for a run whose mapping never covered the required fields:
    /// no row was normalized.
    pub fn escalate(mapping_info: MappingInfo) -> ImportResult {
        ImportResult {
            accepted_count: 0,
            rejected_count: 0,
            needs_mapping: true,
            mapping_info: Some(mapping_info),
            errors: Vec::new(),
            warnings: Vec::new(),
            complete: false,
        }
    }

    pub fn accept(&mut self, warnings: Vec<RowWarning>) {
        self.accepted += 1;
        self.warnings
            .extend(warnings.into_iter().map(|warning| warning.to_string()));
    }

    pub fn reject(&mut self, error: RowError) {
        tracing::debug!(%error, "row rejected");
        self.rejected += 1;
        self.missing_required_only &= error.is_missing_required();
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(error);
        }
    }

    pub fn conflicts(&mut self, conflicts: &[MappingConflict]) {
        self.warnings
            .extend(conflicts.iter().map(|conflict| conflict.to_string()));
    }

    /// Records the decoding error that ended the stream early.
    pub fn abort(&mut self, row: u64, message: impl Into<String>) {
        self.reject(RowError::format(row, message));
        self.missing_required_only = false;
        self.complete = false;
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Raises `needs_mapping` when nothing was accepted and every rejection
    /// came from missing required fields.
    pub fn finish(mut self) -> ImportResult {
        let dropped = self.rejected.saturating_sub(self.errors.len() as u64);
        if dropped > 0 {
            self.warnings
                .push(format!("{dropped} more row errors not listed"));
        }
        let needs_mapping = self.accepted == 0 && self.rejected > 0 && self.missing_required_only;
        ImportResult {
            accepted_count: self.accepted,
            rejected_count: self.rejected,
            needs_mapping,
            mapping_info: needs_mapping.then_some(self.mapping_info),
            errors: self.errors,
            warnings: self.warnings,
            complete: self.complete,
        }
    }
}
