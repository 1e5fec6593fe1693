use crate::error::CoreError;
use crate::text::fold;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a contact attempt, as used by the calling team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Undefined,
    WrongNumber,
    Voicemail,
    CallBack,
    NotInterested,
    Argued,
    Do,
    Ro,
    Blacklisted,
    Premature,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 10] = [
        ContactStatus::Undefined,
        ContactStatus::WrongNumber,
        ContactStatus::Voicemail,
        ContactStatus::CallBack,
        ContactStatus::NotInterested,
        ContactStatus::Argued,
        ContactStatus::Do,
        ContactStatus::Ro,
        ContactStatus::Blacklisted,
        ContactStatus::Premature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::Undefined => "undefined",
            ContactStatus::WrongNumber => "wrong_number",
            ContactStatus::Voicemail => "voicemail",
            ContactStatus::CallBack => "call_back",
            ContactStatus::NotInterested => "not_interested",
            ContactStatus::Argued => "argued",
            ContactStatus::Do => "do",
            ContactStatus::Ro => "ro",
            ContactStatus::Blacklisted => "blacklisted",
            ContactStatus::Premature => "premature",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContactStatus::Undefined => "Non défini",
            ContactStatus::WrongNumber => "Mauvais num",
            ContactStatus::Voicemail => "Répondeur",
            ContactStatus::CallBack => "À rappeler",
            ContactStatus::NotInterested => "Pas intéressé",
            ContactStatus::Argued => "Argumenté",
            ContactStatus::Do => "DO",
            ContactStatus::Ro => "RO",
            ContactStatus::Blacklisted => "Liste noire",
            ContactStatus::Premature => "Prématuré",
        }
    }

    /// Matches a business label or storage key, ignoring case and accents.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded = fold(raw);
        if folded.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|status| fold(status.label()) == folded || status.as_str() == folded)
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContactStatus {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw).ok_or_else(|| CoreError::InvalidStatus(raw.to_string()))
    }
}
