use crate::error::invalid_input;
use anyhow::{anyhow, Result};
use dimicall_core::time::{parse_date, parse_instant};
use dimicall_core::{ContactId, ContactStatus, MappingTarget};
use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;

pub use dimicall_core::time::now_utc;

pub fn parse_contact_id(raw: &str) -> Result<ContactId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid_input("contact id cannot be empty"));
    }
    ContactId::from_str(trimmed).map_err(|_| invalid_input(format!("invalid contact id: {trimmed}")))
}

/// Parses a `COLUMN=FIELD` override. `FIELD` may be `unmapped`.
pub fn parse_mapping_override(raw: &str) -> Result<(String, MappingTarget)> {
    let (column, field) = raw
        .rsplit_once('=')
        .ok_or_else(|| invalid_input(format!("expected COLUMN=FIELD, got {raw:?}")))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(invalid_input(format!("missing column name in {raw:?}")));
    }
    if field.trim().is_empty() {
        return Err(invalid_input(format!("missing target field in {raw:?}")));
    }
    let target = MappingTarget::from_str(field)?;
    Ok((column.to_string(), target))
}

pub fn parse_call_date(raw: &str) -> Result<NaiveDate> {
    Ok(parse_date(raw)?)
}

pub fn parse_status(raw: &str) -> Result<ContactStatus> {
    Ok(ContactStatus::from_str(raw)?)
}

pub fn parse_call_instant(raw: &str) -> Result<DateTime<Utc>> {
    parse_instant(raw).map_err(|err| anyhow!(err).context(format!("invalid instant {raw:?}")))
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
