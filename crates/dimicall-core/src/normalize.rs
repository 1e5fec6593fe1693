use crate::domain::calls::NewCall;
use crate::domain::email::{looks_like_email, normalize_email};
use crate::domain::field::CanonicalField;
use crate::domain::phone::canonicalize_phone;
use crate::domain::status::ContactStatus;
use crate::domain::Contact;
use crate::record::{RawRecord, RawValue};
use crate::schema::{match_iteration, ColumnMappings, Schema};
use crate::text::fold;
use crate::time::{date_from_serial, parse_date, parse_time, time_from_day_fraction};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Also copy numbered call columns (index 1 to 4) into the matching call slot.
    pub slot_aware: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowErrorKind {
    MissingRequired { fields: Vec<CanonicalField> },
    Format { message: String },
}

/// A rejected row. `row` is the 0-based index among data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: u64,
    #[serde(flatten)]
    pub kind: RowErrorKind,
}

impl RowError {
    pub fn missing_required(row: u64, fields: Vec<CanonicalField>) -> Self {
        Self {
            row,
            kind: RowErrorKind::MissingRequired { fields },
        }
    }

    pub fn format(row: u64, message: impl Into<String>) -> Self {
        Self {
            row,
            kind: RowErrorKind::Format {
                message: message.into(),
            },
        }
    }

    pub fn is_missing_required(&self) -> bool {
        matches!(self.kind, RowErrorKind::MissingRequired { .. })
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RowErrorKind::MissingRequired { fields } => {
                let names: Vec<_> = fields.iter().map(|field| field.key()).collect();
                write!(f, "row {}: missing {}", self.row, names.join(", "))
            }
            RowErrorKind::Format { message } => write!(f, "row {}: {}", self.row, message),
        }
    }
}

/// A value that was dropped or replaced while normalizing an accepted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    pub row: u64,
    pub column: String,
    pub message: String,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, column '{}': {}", self.row, self.column, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub contact: Contact,
    pub warnings: Vec<RowWarning>,
}

#[derive(Debug, Clone)]
struct FieldSource {
    column: String,
    position: usize,
    priority: u32,
    slot: Option<u8>,
}

#[derive(Debug)]
enum Converted {
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Status(ContactStatus),
}

/// Turns raw rows into contacts for one fixed mapping.
///
/// Columns that converge on the same field are tried by ascending priority,
/// then by column position; the first one holding a usable value wins. Empty
/// cells never overwrite anything.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    plan: Vec<(CanonicalField, Vec<FieldSource>)>,
    options: NormalizeOptions,
}

impl RecordNormalizer {
    pub fn new(schema: &Schema, mappings: &ColumnMappings, options: NormalizeOptions) -> Self {
        let mut grouped: BTreeMap<CanonicalField, Vec<FieldSource>> = BTreeMap::new();
        for mapping in mappings.iter() {
            let Some(field) = mapping.target_field.field() else {
                continue;
            };
            let Some(position) = schema.position(&mapping.source_column) else {
                continue;
            };
            let slot = if options.slot_aware {
                match_iteration(&fold(&mapping.source_column))
                    .filter(|hit| hit.target == field && hit.priority == mapping.priority)
                    .and_then(|hit| hit.call_slot())
            } else {
                None
            };
            grouped.entry(field).or_default().push(FieldSource {
                column: mapping.source_column.clone(),
                position,
                priority: mapping.priority,
                slot,
            });
        }

        let plan = grouped
            .into_iter()
            .map(|(field, mut sources)| {
                sources.sort_by_key(|source| (source.priority, source.position));
                (field, sources)
            })
            .collect();
        Self { plan, options }
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    pub fn normalize(&self, record: &RawRecord) -> Result<NormalizedRow, RowError> {
        let row = record.row();
        let mut contact = Contact {
            row_number: Some(row + 1),
            ..Contact::new()
        };
        let mut warnings = Vec::new();
        let mut imported_calls: BTreeMap<u8, NewCall> = BTreeMap::new();

        for (field, sources) in &self.plan {
            let mut written = false;
            for source in sources {
                if written && source.slot.is_none() {
                    continue;
                }
                let Some(value) = record.get(&source.column).filter(|value| !value.is_empty())
                else {
                    continue;
                };
                let Some(converted) = convert(*field, value, row, &source.column, &mut warnings)
                else {
                    continue;
                };
                if let Some(slot) = source.slot {
                    stage_call(imported_calls.entry(slot).or_default(), &converted);
                }
                if !written {
                    assign(&mut contact, *field, converted);
                    written = true;
                }
            }
        }

        for (slot, call) in &imported_calls {
            if let Err(err) = contact.calls.fill_imported(*slot, call) {
                tracing::debug!(row, slot, %err, "imported call slot skipped");
            }
        }

        let missing = contact.missing_required();
        if !missing.is_empty() {
            return Err(RowError::missing_required(row, missing));
        }
        Ok(NormalizedRow { contact, warnings })
    }
}

fn convert(
    field: CanonicalField,
    value: &RawValue,
    row: u64,
    column: &str,
    warnings: &mut Vec<RowWarning>,
) -> Option<Converted> {
    let mut warn = |message: String| {
        warnings.push(RowWarning {
            row,
            column: column.to_string(),
            message,
        })
    };
    let text = value.as_text()?;

    match field {
        CanonicalField::Phone => Some(Converted::Text(canonicalize_phone(&text))),
        CanonicalField::Email => {
            let email = normalize_email(&text)?;
            if !looks_like_email(&email) {
                warn(format!("'{email}' does not look like an email address"));
            }
            Some(Converted::Text(email))
        }
        CanonicalField::Status | CanonicalField::CallStatus => {
            let status = ContactStatus::parse(&text).unwrap_or_else(|| {
                warn(format!("unknown status '{text}', using '{}'", ContactStatus::Undefined));
                ContactStatus::Undefined
            });
            Some(Converted::Status(status))
        }
        CanonicalField::CallbackDate | CanonicalField::AppointmentDate | CanonicalField::CallDate => {
            let parsed = match value.as_number() {
                Some(serial) => date_from_serial(serial),
                None => parse_date(&text),
            };
            match parsed {
                Ok(date) => Some(Converted::Date(date)),
                Err(err) => {
                    warn(err.to_string());
                    None
                }
            }
        }
        CanonicalField::CallbackTime | CanonicalField::AppointmentTime | CanonicalField::CallTime => {
            let parsed = match value.as_number() {
                Some(fraction) => time_from_day_fraction(fraction.fract()),
                None => parse_time(&text),
            };
            match parsed {
                Ok(time) => Some(Converted::Time(time)),
                Err(err) => {
                    warn(err.to_string());
                    None
                }
            }
        }
        _ => Some(Converted::Text(text.into_owned())),
    }
}

fn stage_call(call: &mut NewCall, value: &Converted) {
    match value {
        Converted::Date(date) => call.date = Some(*date),
        Converted::Status(status) => call.status = Some(*status),
        Converted::Text(comment) => call.comment = Some(comment.clone()),
        Converted::Time(_) => {}
    }
}

fn assign(contact: &mut Contact, field: CanonicalField, value: Converted) {
    use CanonicalField as F;
    match (field, value) {
        (F::FirstName, Converted::Text(v)) => contact.first_name = Some(v),
        (F::LastName, Converted::Text(v)) => contact.last_name = Some(v),
        (F::Phone, Converted::Text(v)) => contact.phone = Some(v),
        (F::Email, Converted::Text(v)) => contact.email = Some(v),
        (F::Source, Converted::Text(v)) => contact.source = Some(v),
        (F::Status, Converted::Status(v)) => contact.status = v,
        (F::Comment, Converted::Text(v)) => contact.comment = Some(v),
        (F::CallbackDate, Converted::Date(v)) => contact.callback.date = Some(v),
        (F::CallbackTime, Converted::Time(v)) => contact.callback.time = Some(v),
        (F::AppointmentDate, Converted::Date(v)) => contact.appointment.date = Some(v),
        (F::AppointmentTime, Converted::Time(v)) => contact.appointment.time = Some(v),
        (F::AppointmentType, Converted::Text(v)) => contact.appointment_type = Some(v),
        (F::AppointmentStatus, Converted::Text(v)) => contact.appointment_status = Some(v),
        (F::AppointmentComment, Converted::Text(v)) => contact.appointment_comment = Some(v),
        (F::CallDate, Converted::Date(v)) => contact.call_date = Some(v),
        (F::CallTime, Converted::Time(v)) => contact.call_time = Some(v),
        (F::CallDuration, Converted::Text(v)) => contact.call_duration = Some(v),
        (F::CallStatus, Converted::Status(v)) => contact.call_status = Some(v),
        (F::CallComment, Converted::Text(v)) => contact.call_comment = Some(v),
        (F::Sex, Converted::Text(v)) => contact.sex = Some(v),
        (F::Donation, Converted::Text(v)) => contact.donation = Some(v),
        (F::Quality, Converted::Text(v)) => contact.quality = Some(v),
        (F::Kind, Converted::Text(v)) => contact.kind = Some(v),
        (F::Uid, Converted::Text(v)) => contact.uid = Some(v),
        (field, value) => tracing::debug!(%field, ?value, "value does not fit field"),
    }
}

#[cfg(test)]
mod tests {
    use super::{NormalizeOptions, RecordNormalizer, RowErrorKind};
    use crate::domain::field::CanonicalField;
    use crate::domain::status::ContactStatus;
    use crate::record::{RawRecord, RawValue};
    use crate::schema::{MappingTarget, Schema, SchemaMapper};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn setup(headers: &[&str], options: NormalizeOptions) -> (Arc<Schema>, RecordNormalizer) {
        let schema = Arc::new(Schema::discover(headers));
        let mappings = SchemaMapper::default().map(&schema);
        let normalizer = RecordNormalizer::new(&schema, &mappings, options);
        (schema, normalizer)
    }

    fn row(schema: &Arc<Schema>, index: u64, cells: &[&str]) -> RawRecord {
        RawRecord::from_values(
            Arc::clone(schema),
            index,
            cells.iter().map(|cell| RawValue::from(*cell)).collect(),
        )
    }

    #[test]
    fn complete_row_becomes_a_contact() {
        let (schema, normalizer) = setup(
            &["Prénom", "Nom", "Numéro", "Email", "Statut", "Date rappel"],
            NormalizeOptions::default(),
        );
        let record = row(
            &schema,
            0,
            &["Jean", "Dupont", "06 12 34 56 78", " Jean@X.fr ", "à rappeler", "15/03/2024"],
        );
        let normalized = normalizer.normalize(&record).unwrap();
        let contact = normalized.contact;
        assert_eq!(contact.phone.as_deref(), Some("+33 6 12 34 56 78"));
        assert_eq!(contact.email.as_deref(), Some("jean@x.fr"));
        assert_eq!(contact.status, ContactStatus::CallBack);
        assert_eq!(contact.callback.date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(contact.row_number, Some(1));
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn missing_required_field_rejects_the_row() {
        let (schema, normalizer) = setup(&["Prénom", "Nom", "Numéro"], NormalizeOptions::default());
        let err = normalizer
            .normalize(&row(&schema, 2, &["", "Martin", ""]))
            .unwrap_err();
        assert_eq!(err.row, 2);
        assert_eq!(
            err.kind,
            RowErrorKind::MissingRequired {
                fields: vec![CanonicalField::FirstName, CanonicalField::Phone]
            }
        );
        assert!(err.is_missing_required());
    }

    #[test]
    fn unknown_status_falls_back_with_warning() {
        let (schema, normalizer) =
            setup(&["Prénom", "Nom", "Tel", "Statut"], NormalizeOptions::default());
        let normalized = normalizer
            .normalize(&row(&schema, 0, &["A", "B", "0612345678", "peut-être"]))
            .unwrap();
        assert_eq!(normalized.contact.status, ContactStatus::Undefined);
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(normalized.warnings[0].column, "Statut");
    }

    #[test]
    fn lowest_priority_wins_regardless_of_column_order() {
        let (schema, normalizer) = setup(
            &["Prénom", "Nom", "Tel", "statut_appel_2", "statut_appel_1", "statut_appel_3"],
            NormalizeOptions::default(),
        );
        let normalized = normalizer
            .normalize(&row(
                &schema,
                0,
                &["A", "B", "0612345678", "Répondeur", "DO", "Argumenté"],
            ))
            .unwrap();
        assert_eq!(normalized.contact.call_status, Some(ContactStatus::Do));

        let skipped_first = normalizer
            .normalize(&row(&schema, 1, &["A", "B", "0612345678", "Répondeur", " ", "RO"]))
            .unwrap();
        assert_eq!(
            skipped_first.contact.call_status,
            Some(ContactStatus::Voicemail)
        );
    }

    #[test]
    fn empty_cells_never_clear_values() {
        let (schema, normalizer) = setup(
            &["Prénom", "Nom", "Tel", "commentaires_appel_1", "commentaires_appel_2"],
            NormalizeOptions::default(),
        );
        let normalized = normalizer
            .normalize(&row(&schema, 0, &["A", "B", "0612345678", "", "rappel lundi"]))
            .unwrap();
        assert_eq!(
            normalized.contact.call_comment.as_deref(),
            Some("rappel lundi")
        );
    }

    #[test]
    fn slot_aware_merging_fills_call_history() {
        let headers = [
            "Prénom",
            "Nom",
            "Tel",
            "date_appel_1",
            "statut_appel_1",
            "date_appel_3",
            "statut_appel_3",
            "commentaires_appel_3",
        ];
        let cells = [
            "A",
            "B",
            "0612345678",
            "01/03/2024",
            "Répondeur",
            "05/03/2024",
            "RO",
            "signé",
        ];

        let (schema, flat) = setup(&headers, NormalizeOptions::default());
        let contact = flat.normalize(&row(&schema, 0, &cells)).unwrap().contact;
        assert_eq!(contact.calls.used(), 0);

        let (schema, aware) = setup(&headers, NormalizeOptions { slot_aware: true });
        let contact = aware.normalize(&row(&schema, 0, &cells)).unwrap().contact;
        assert_eq!(contact.call_status, Some(ContactStatus::Voicemail));
        assert_eq!(contact.calls.used(), 2);
        let third = contact.calls.slot(3).unwrap();
        assert_eq!(third.status, Some(ContactStatus::Ro));
        assert_eq!(third.comment.as_deref(), Some("signé"));
        assert_eq!(contact.calls.first_free(), Some(2));
    }

    #[test]
    fn spreadsheet_numbers_are_read_as_dates_and_phones() {
        let schema = Arc::new(Schema::discover(["Prénom", "Nom", "Tel", "date_rdv", "heure_rdv"]));
        let mappings = SchemaMapper::default().map(&schema);
        let normalizer = RecordNormalizer::new(&schema, &mappings, NormalizeOptions::default());
        let record = RawRecord::from_values(
            Arc::clone(&schema),
            0,
            vec![
                "A".into(),
                "B".into(),
                RawValue::Number(612345678.0),
                RawValue::Number(45366.0),
                RawValue::Number(0.75),
            ],
        );
        let contact = normalizer.normalize(&record).unwrap().contact;
        assert_eq!(contact.phone.as_deref(), Some("+33 6 12 34 56 78"));
        assert_eq!(contact.appointment.date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(
            contact.appointment.time,
            chrono::NaiveTime::from_hms_opt(18, 0, 0)
        );
    }

    #[test]
    fn overrides_feed_the_normalizer() {
        let schema = Arc::new(Schema::discover(["Prénom", "Nom", "Contact"]));
        let mapper = SchemaMapper::default();
        let mut mappings = mapper.map(&schema);
        mapper
            .apply_override(
                &mut mappings,
                &schema,
                "Contact",
                MappingTarget::Field(CanonicalField::Phone),
            )
            .unwrap();
        let normalizer = RecordNormalizer::new(&schema, &mappings, NormalizeOptions::default());
        let contact = normalizer
            .normalize(&row(&schema, 0, &["A", "B", "0712345678"]))
            .unwrap()
            .contact;
        assert_eq!(contact.phone.as_deref(), Some("+33 7 12 34 56 78"));
    }
}
