use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// One untyped cell as read from a file or an external store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Number(n) => !n.is_finite(),
            RawValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Trimmed text form; whole numbers print without a fractional part.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Null => None,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(Cow::Borrowed(trimmed))
            }
            RawValue::Number(n) if !n.is_finite() => None,
            RawValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *n as i64)))
            }
            RawValue::Number(n) => Some(Cow::Owned(n.to_string())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Null, Into::into)
    }
}

/// One source row before normalization.
///
/// Values for schema columns are stored by position. Cells the schema does
/// not know about (keys missing from the discovered snapshot, or trailing
/// cells past the header) go to `extras` and are never mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    schema: Arc<Schema>,
    row: u64,
    values: Vec<RawValue>,
    extras: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn from_values(schema: Arc<Schema>, row: u64, mut values: Vec<RawValue>) -> Self {
        let width = schema.len();
        let extras = if values.len() > width {
            values
                .drain(width..)
                .enumerate()
                .filter(|(_, value)| !value.is_empty())
                .map(|(offset, value)| (format!("column {}", width + offset + 1), value))
                .collect()
        } else {
            Vec::new()
        };
        values.resize(width, RawValue::Null);
        Self {
            schema,
            row,
            values,
            extras,
        }
    }

    pub fn from_pairs<I, K>(schema: Arc<Schema>, row: u64, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: Into<String>,
    {
        let mut values = vec![RawValue::Null; schema.len()];
        let mut extras = Vec::new();
        for (column, value) in pairs {
            let column = column.into();
            match schema.position(column.trim()) {
                Some(position) => values[position] = value,
                None => extras.push((column, value)),
            }
        }
        Self {
            schema,
            row,
            values,
            extras,
        }
    }

    /// 0-based index of the row among the data rows of its source.
    pub fn row(&self) -> u64 {
        self.row
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.schema
            .position(column)
            .and_then(|position| self.values.get(position))
    }

    pub fn values(&self) -> &[RawValue] {
        &self.values
    }

    pub fn extras(&self) -> &[(String, RawValue)] {
        &self.extras
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(RawValue::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::{RawRecord, RawValue};
    use crate::schema::Schema;
    use std::sync::Arc;

    #[test]
    fn numbers_print_like_spreadsheet_cells() {
        assert_eq!(RawValue::Number(612345678.0).as_text().unwrap(), "612345678");
        assert_eq!(RawValue::Number(1.5).as_text().unwrap(), "1.5");
        assert_eq!(RawValue::from("  x ").as_text().unwrap(), "x");
        assert!(RawValue::from("   ").as_text().is_none());
    }

    #[test]
    fn trailing_cells_go_to_extras() {
        let schema = Arc::new(Schema::discover(["Nom"]));
        let record = RawRecord::from_values(
            schema,
            4,
            vec!["Dupont".into(), RawValue::Null, "surplus".into()],
        );
        assert_eq!(record.get("Nom"), Some(&RawValue::from("Dupont")));
        assert_eq!(
            record.extras(),
            [("column 3".to_string(), RawValue::from("surplus"))]
        );
        assert_eq!(record.row(), 4);
    }

    #[test]
    fn padded_keys_land_on_their_trimmed_column() {
        let schema = Arc::new(Schema::discover([" nom "]));
        let record = RawRecord::from_pairs(schema, 0, [(" nom ", RawValue::from("Dupont"))]);
        assert_eq!(record.get("nom"), Some(&RawValue::from("Dupont")));
        assert!(record.extras().is_empty());
    }

    #[test]
    fn unknown_keys_go_to_extras() {
        let schema = Arc::new(Schema::discover(["prenom", "nom"]));
        let record = RawRecord::from_pairs(
            schema,
            0,
            [
                ("nom", RawValue::from("Martin")),
                ("created_at", RawValue::from("2024-01-01")),
            ],
        );
        assert_eq!(record.get("prenom"), Some(&RawValue::Null));
        assert_eq!(record.get("created_at"), None);
        assert_eq!(record.extras().len(), 1);
        assert!(!record.is_blank());
    }

    #[test]
    fn short_rows_are_padded() {
        let schema = Arc::new(Schema::discover(["a", "b"]));
        let record = RawRecord::from_values(schema, 0, vec![RawValue::from(" ")]);
        assert_eq!(record.values().len(), 2);
        assert!(record.is_blank());
    }
}
