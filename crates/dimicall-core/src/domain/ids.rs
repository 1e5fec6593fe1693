use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Random (v4) identifiers, stored and printed in hyphenated form.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::try_parse(raw.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// A stored contact.
    ContactId
);
uuid_id!(
    /// One run of the import pipeline against the store.
    ImportRunId
);

#[cfg(test)]
mod tests {
    use super::{ContactId, ImportRunId};
    use std::str::FromStr;

    #[test]
    fn ids_print_hyphenated_and_parse_back() {
        let id = ContactId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(ContactId::from_str(&format!(" {text} ")).unwrap(), id);
    }

    #[test]
    fn garbage_is_not_an_id() {
        assert!(ImportRunId::from_str("run-1").is_err());
        assert!(ImportRunId::from_str("").is_err());
    }
}
