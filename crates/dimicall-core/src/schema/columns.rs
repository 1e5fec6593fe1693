use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// The ordered, de-duplicated column set discovered on a source.
///
/// Captured once per import, from the header row of a file or from the
/// first page of rows pulled from an external store, and passed explicitly
/// to every step that needs to resolve columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Blank headers are named after their position and repeated headers get
    /// a ` (n)` suffix, so every column name is unique.
    pub fn discover<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schema = Schema::default();
        for (position, header) in headers.into_iter().enumerate() {
            let header = header.as_ref().trim();
            let base = if header.is_empty() {
                format!("column {}", position + 1)
            } else {
                header.to_string()
            };
            let mut name = base.clone();
            let mut copy = 2;
            while schema.index.contains_key(&name) {
                name = format!("{base} ({copy})");
                copy += 1;
            }
            if name != base {
                tracing::warn!(column = %base, renamed = %name, "duplicate column header");
            }
            schema.index.insert(name.clone(), schema.columns.len());
            schema.columns.push(name);
        }
        schema
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}
