use crate::domain::field::CanonicalField;
use crate::error::CoreError;
use crate::schema::columns::Schema;
use crate::schema::header::HeaderNormalizer;
use crate::schema::patterns::match_iteration;
use crate::text::fold;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Header keys mapped one to one onto a canonical field.
const DIRECT: &[(&str, CanonicalField)] = &[
    ("prenom", CanonicalField::FirstName),
    ("nom", CanonicalField::LastName),
    ("telephone", CanonicalField::Phone),
    ("email", CanonicalField::Email),
    ("source", CanonicalField::Source),
    ("statut", CanonicalField::Status),
    ("statut_final", CanonicalField::Status),
    ("commentaire", CanonicalField::Comment),
    ("date_rappel", CanonicalField::CallbackDate),
    ("heure_rappel", CanonicalField::CallbackTime),
    ("date_rdv", CanonicalField::AppointmentDate),
    ("heure_rdv", CanonicalField::AppointmentTime),
    ("date_appel", CanonicalField::CallDate),
    ("heure_appel", CanonicalField::CallTime),
    ("duree_appel", CanonicalField::CallDuration),
    ("sexe", CanonicalField::Sex),
    ("don", CanonicalField::Donation),
    ("qualite", CanonicalField::Quality),
    ("type", CanonicalField::Kind),
    ("uid", CanonicalField::Uid),
];

pub const UNMAPPED: &str = "unmapped";

fn direct_field(key: &str) -> Option<CanonicalField> {
    DIRECT
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, field)| *field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MappingTarget {
    Field(CanonicalField),
    Unmapped,
}

impl MappingTarget {
    pub fn field(self) -> Option<CanonicalField> {
        match self {
            MappingTarget::Field(field) => Some(field),
            MappingTarget::Unmapped => None,
        }
    }
}

impl fmt::Display for MappingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingTarget::Field(field) => f.write_str(field.key()),
            MappingTarget::Unmapped => f.write_str(UNMAPPED),
        }
    }
}

impl FromStr for MappingTarget {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            UNMAPPED | "no-mapping" | "none" => Ok(MappingTarget::Unmapped),
            _ => raw.parse().map(MappingTarget::Field),
        }
    }
}

impl From<MappingTarget> for String {
    fn from(value: MappingTarget) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for MappingTarget {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_field: MappingTarget,
    pub priority: u32,
}

impl ColumnMapping {
    fn unmapped(column: &str) -> Self {
        Self {
            source_column: column.to_string(),
            target_field: MappingTarget::Unmapped,
            priority: 0,
        }
    }
}

/// Two columns competing for a single-valued field. `kept` holds the field,
/// `demoted` was moved to the unmapped bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConflict {
    pub field: CanonicalField,
    pub kept: String,
    pub demoted: String,
}

impl fmt::Display for MappingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}' left unmapped: {} is already taken by '{}'",
            self.demoted, self.field, self.kept
        )
    }
}

/// The mapping of one import session: one entry per non-excluded column,
/// direct mappings first, then iteration mappings, then unmapped columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMappings {
    mappings: Vec<ColumnMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    conflicts: Vec<MappingConflict>,
}

impl ColumnMappings {
    pub fn as_slice(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnMapping> {
        self.mappings.iter().find(|m| m.source_column == column)
    }

    pub fn conflicts(&self) -> &[MappingConflict] {
        &self.conflicts
    }

    pub fn for_field(&self, field: CanonicalField) -> impl Iterator<Item = &ColumnMapping> {
        self.mappings
            .iter()
            .filter(move |m| m.target_field == MappingTarget::Field(field))
    }

    pub fn mapped_fields(&self) -> BTreeSet<CanonicalField> {
        self.mappings
            .iter()
            .filter_map(|m| m.target_field.field())
            .collect()
    }

    pub fn missing_required(&self) -> Vec<CanonicalField> {
        let mapped = self.mapped_fields();
        CanonicalField::REQUIRED
            .into_iter()
            .filter(|field| !mapped.contains(field))
            .collect()
    }

    /// Fails when a required field has no source column at all.
    pub fn require_fields(&self) -> Result<(), CoreError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingRequiredFields(missing))
        }
    }

    pub fn unmapped_columns(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .filter(|m| m.target_field == MappingTarget::Unmapped)
            .map(|m| m.source_column.as_str())
            .collect()
    }
}

/// Builds column mappings from a discovered schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaMapper {
    headers: HeaderNormalizer,
    excluded: HashSet<String>,
}

impl SchemaMapper {
    pub fn new(headers: HeaderNormalizer) -> Self {
        Self {
            headers,
            excluded: HashSet::new(),
        }
    }

    /// Columns never offered for mapping, such as row-number columns.
    pub fn with_excluded<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded
            .extend(columns.into_iter().map(|c| fold(c.as_ref())));
        self
    }

    pub fn headers(&self) -> &HeaderNormalizer {
        &self.headers
    }

    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded.contains(&fold(column))
    }

    /// Direct pass, then iteration pass, over the non-excluded columns.
    /// Pure: the same schema always yields the same mappings.
    pub fn map(&self, schema: &Schema) -> ColumnMappings {
        let mut direct = Vec::new();
        let mut iteration = Vec::new();
        let mut unmapped = Vec::new();
        let mut conflicts = Vec::new();
        let mut claimed: HashMap<CanonicalField, &str> = HashMap::new();

        for column in schema.columns() {
            if self.is_excluded(column) {
                continue;
            }
            let header = self.headers.normalize(column);

            if let Some(field) = direct_field(&header.key) {
                if !field.is_iteration_target() {
                    if let Some(kept) = claimed.get(&field) {
                        let conflict = MappingConflict {
                            field,
                            kept: (*kept).to_string(),
                            demoted: column.clone(),
                        };
                        tracing::warn!(%conflict, "mapping conflict");
                        conflicts.push(conflict);
                        unmapped.push(ColumnMapping::unmapped(column));
                        continue;
                    }
                    claimed.insert(field, column);
                }
                direct.push(ColumnMapping {
                    source_column: column.clone(),
                    target_field: MappingTarget::Field(field),
                    priority: 0,
                });
                continue;
            }

            match match_iteration(&header.key) {
                Some(hit) => iteration.push(ColumnMapping {
                    source_column: column.clone(),
                    target_field: MappingTarget::Field(hit.target),
                    priority: hit.priority,
                }),
                None => {
                    tracing::debug!(column = %column, "column left unmapped");
                    unmapped.push(ColumnMapping::unmapped(column));
                }
            }
        }

        direct.append(&mut iteration);
        direct.append(&mut unmapped);
        ColumnMappings {
            mappings: direct,
            conflicts,
        }
    }

    /// Applies an operator's choice for one column. Assigning a single-valued
    /// field demotes whichever column held it before; the demotions are
    /// returned. Iteration fields accept any number of columns.
    pub fn apply_override(
        &self,
        mappings: &mut ColumnMappings,
        schema: &Schema,
        column: &str,
        target: MappingTarget,
    ) -> Result<Vec<MappingConflict>, CoreError> {
        if !schema.contains(column) {
            return Err(CoreError::UnknownColumn(column.to_string()));
        }
        if self.is_excluded(column) {
            return Err(CoreError::ExcludedColumn(column.to_string()));
        }

        let mut demoted = Vec::new();
        let priority = match target {
            MappingTarget::Unmapped => 0,
            MappingTarget::Field(field) => match_iteration(&self.headers.key(column))
                .filter(|hit| hit.target == field)
                .map_or(0, |hit| hit.priority),
        };

        if let MappingTarget::Field(field) = target {
            if !field.is_iteration_target() {
                for mapping in mappings.mappings.iter_mut() {
                    if mapping.source_column != column && mapping.target_field == target {
                        let conflict = MappingConflict {
                            field,
                            kept: column.to_string(),
                            demoted: mapping.source_column.clone(),
                        };
                        tracing::warn!(%conflict, "mapping override demoted a column");
                        mapping.target_field = MappingTarget::Unmapped;
                        mapping.priority = 0;
                        demoted.push(conflict);
                    }
                }
            }
        }

        match mappings
            .mappings
            .iter_mut()
            .find(|m| m.source_column == column)
        {
            Some(mapping) => {
                mapping.target_field = target;
                mapping.priority = priority;
            }
            None => mappings.mappings.push(ColumnMapping {
                source_column: column.to_string(),
                target_field: target,
                priority,
            }),
        }

        mappings.conflicts.extend(demoted.iter().cloned());
        Ok(demoted)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnMapping, MappingTarget, SchemaMapper};
    use crate::domain::field::CanonicalField;
    use crate::error::CoreError;
    use crate::schema::columns::Schema;
    use proptest::prelude::*;

    fn mapper() -> SchemaMapper {
        SchemaMapper::default().with_excluded(["Nu"])
    }

    fn target(mapping: Option<&ColumnMapping>) -> MappingTarget {
        mapping.unwrap().target_field
    }

    #[test]
    fn direct_columns_map_one_to_one() {
        let schema = Schema::discover(["Prénom", "Nom", "Numéro", "Email", "statut_final", "UID"]);
        let mappings = mapper().map(&schema);
        let fields: Vec<_> = mappings.iter().map(|m| m.target_field).collect();
        assert_eq!(
            fields,
            vec![
                MappingTarget::Field(CanonicalField::FirstName),
                MappingTarget::Field(CanonicalField::LastName),
                MappingTarget::Field(CanonicalField::Phone),
                MappingTarget::Field(CanonicalField::Email),
                MappingTarget::Field(CanonicalField::Status),
                MappingTarget::Field(CanonicalField::Uid),
            ]
        );
        assert!(mappings.iter().all(|m| m.priority == 0));
        assert!(mappings.require_fields().is_ok());
    }

    #[test]
    fn numbered_call_columns_converge() {
        let schema = Schema::discover([
            "date_appel_1",
            "statut_appel_1",
            "date_appel_2",
            "statut_appel_2",
        ]);
        let mappings = mapper().map(&schema);
        let got: Vec<_> = mappings
            .iter()
            .map(|m| (m.source_column.as_str(), m.target_field, m.priority))
            .collect();
        let date = MappingTarget::Field(CanonicalField::CallDate);
        let status = MappingTarget::Field(CanonicalField::CallStatus);
        assert_eq!(
            got,
            vec![
                ("date_appel_1", date, 1),
                ("statut_appel_1", status, 1),
                ("date_appel_2", date, 2),
                ("statut_appel_2", status, 2),
            ]
        );
    }

    #[test]
    fn output_orders_direct_then_iteration_then_unmapped() {
        let schema = Schema::discover(["Ville", "date_r1_2", "Nom", "Nu"]);
        let mappings = mapper().map(&schema);
        let columns: Vec<_> = mappings.iter().map(|m| m.source_column.as_str()).collect();
        assert_eq!(columns, vec!["Nom", "date_r1_2", "Ville"]);
        assert_eq!(mappings.get("date_r1_2").unwrap().priority, 12);
        assert_eq!(mappings.unmapped_columns(), vec!["Ville"]);
        assert!(mappings.get("Nu").is_none());
    }

    #[test]
    fn duplicate_direct_columns_keep_the_first() {
        let schema = Schema::discover(["Téléphone", "Portable", "Prénom"]);
        let mappings = mapper().map(&schema);
        assert_eq!(
            target(mappings.get("Téléphone")),
            MappingTarget::Field(CanonicalField::Phone)
        );
        assert_eq!(target(mappings.get("Portable")), MappingTarget::Unmapped);
        assert_eq!(mappings.conflicts().len(), 1);
        assert_eq!(mappings.conflicts()[0].kept, "Téléphone");
    }

    #[test]
    fn missing_required_fields_are_listed() {
        let schema = Schema::discover(["Prénom", "Email"]);
        let mappings = mapper().map(&schema);
        assert_eq!(
            mappings.require_fields().unwrap_err(),
            CoreError::MissingRequiredFields(vec![CanonicalField::LastName, CanonicalField::Phone])
        );
    }

    #[test]
    fn override_demotes_previous_claimant() {
        let schema = Schema::discover(["Prénom", "Nom", "Téléphone", "Mobile perso"]);
        let mapper = mapper();
        let mut mappings = mapper.map(&schema);
        assert_eq!(target(mappings.get("Mobile perso")), MappingTarget::Unmapped);

        let demoted = mapper
            .apply_override(
                &mut mappings,
                &schema,
                "Mobile perso",
                MappingTarget::Field(CanonicalField::Phone),
            )
            .unwrap();
        assert_eq!(demoted.len(), 1);
        assert_eq!(demoted[0].demoted, "Téléphone");
        assert_eq!(target(mappings.get("Téléphone")), MappingTarget::Unmapped);
        assert_eq!(mappings.for_field(CanonicalField::Phone).count(), 1);
    }

    #[test]
    fn override_on_iteration_field_keeps_other_columns() {
        let schema = Schema::discover(["statut_appel_1", "Résultat appel"]);
        let mapper = mapper();
        let mut mappings = mapper.map(&schema);
        let demoted = mapper
            .apply_override(
                &mut mappings,
                &schema,
                "Résultat appel",
                MappingTarget::Field(CanonicalField::CallStatus),
            )
            .unwrap();
        assert!(demoted.is_empty());
        assert_eq!(mappings.for_field(CanonicalField::CallStatus).count(), 2);
        assert_eq!(mappings.get("Résultat appel").unwrap().priority, 0);
    }

    #[test]
    fn override_validates_columns() {
        let schema = Schema::discover(["Nu", "Nom"]);
        let mapper = mapper();
        let mut mappings = mapper.map(&schema);
        assert_eq!(
            mapper
                .apply_override(&mut mappings, &schema, "Ville", MappingTarget::Unmapped)
                .unwrap_err(),
            CoreError::UnknownColumn("Ville".into())
        );
        assert_eq!(
            mapper
                .apply_override(
                    &mut mappings,
                    &schema,
                    "Nu",
                    MappingTarget::Field(CanonicalField::Uid)
                )
                .unwrap_err(),
            CoreError::ExcludedColumn("Nu".into())
        );
    }

    #[test]
    fn targets_round_trip_through_strings() {
        assert_eq!(
            "callStatus".parse::<MappingTarget>().unwrap(),
            MappingTarget::Field(CanonicalField::CallStatus)
        );
        assert_eq!(
            "no-mapping".parse::<MappingTarget>().unwrap(),
            MappingTarget::Unmapped
        );
        assert_eq!(MappingTarget::Unmapped.to_string(), "unmapped");
        assert!(matches!(
            "  ".parse::<MappingTarget>(),
            Err(CoreError::UnknownField(_))
        ));
    }

    proptest! {
        #[test]
        fn mapping_is_idempotent(headers in proptest::collection::vec(
            prop_oneof![
                Just("Prénom".to_string()),
                Just("NOM".to_string()),
                Just("tel".to_string()),
                Just("Nu".to_string()),
                Just("statut_final".to_string()),
                Just("Statut".to_string()),
                "date_appel_[0-9]",
                "statut_r[1-3]_[1-4]",
                "[a-z ]{0,8}",
            ],
            0..12,
        )) {
            let schema = Schema::discover(&headers);
            let mapper = mapper();
            let first = serde_json::to_string(&mapper.map(&schema)).unwrap();
            let second = serde_json::to_string(&mapper.map(&schema)).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
