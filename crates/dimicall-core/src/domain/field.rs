use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    FirstName,
    LastName,
    Phone,
    Email,
    Source,
    Status,
    Comment,
    CallbackDate,
    CallbackTime,
    AppointmentDate,
    AppointmentTime,
    AppointmentType,
    AppointmentStatus,
    AppointmentComment,
    CallDate,
    CallTime,
    CallDuration,
    CallStatus,
    CallComment,
    Sex,
    Donation,
    Quality,
    Kind,
    Uid,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 24] = [
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::Phone,
        CanonicalField::Email,
        CanonicalField::Source,
        CanonicalField::Status,
        CanonicalField::Comment,
        CanonicalField::CallbackDate,
        CanonicalField::CallbackTime,
        CanonicalField::AppointmentDate,
        CanonicalField::AppointmentTime,
        CanonicalField::AppointmentType,
        CanonicalField::AppointmentStatus,
        CanonicalField::AppointmentComment,
        CanonicalField::CallDate,
        CanonicalField::CallTime,
        CanonicalField::CallDuration,
        CanonicalField::CallStatus,
        CanonicalField::CallComment,
        CanonicalField::Sex,
        CanonicalField::Donation,
        CanonicalField::Quality,
        CanonicalField::Kind,
        CanonicalField::Uid,
    ];

    /// Fields a contact cannot be imported without.
    pub const REQUIRED: [CanonicalField; 3] = [
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::Phone,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CanonicalField::FirstName => "firstName",
            CanonicalField::LastName => "lastName",
            CanonicalField::Phone => "phone",
            CanonicalField::Email => "email",
            CanonicalField::Source => "source",
            CanonicalField::Status => "status",
            CanonicalField::Comment => "comment",
            CanonicalField::CallbackDate => "callbackDate",
            CanonicalField::CallbackTime => "callbackTime",
            CanonicalField::AppointmentDate => "appointmentDate",
            CanonicalField::AppointmentTime => "appointmentTime",
            CanonicalField::AppointmentType => "appointmentType",
            CanonicalField::AppointmentStatus => "appointmentStatus",
            CanonicalField::AppointmentComment => "appointmentComment",
            CanonicalField::CallDate => "callDate",
            CanonicalField::CallTime => "callTime",
            CanonicalField::CallDuration => "callDuration",
            CanonicalField::CallStatus => "callStatus",
            CanonicalField::CallComment => "callComment",
            CanonicalField::Sex => "sex",
            CanonicalField::Donation => "donation",
            CanonicalField::Quality => "quality",
            CanonicalField::Kind => "kind",
            CanonicalField::Uid => "uid",
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Fields that numbered source columns converge on. Several columns may
    /// map to one of these at the same time; every other field holds a single
    /// active mapping.
    pub fn is_iteration_target(self) -> bool {
        matches!(
            self,
            CanonicalField::CallDate
                | CanonicalField::CallStatus
                | CanonicalField::CallComment
                | CanonicalField::AppointmentDate
                | CanonicalField::AppointmentType
                | CanonicalField::AppointmentStatus
                | CanonicalField::AppointmentComment
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CanonicalField {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(value))
            .ok_or_else(|| CoreError::UnknownField(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::CanonicalField;

    #[test]
    fn keys_parse_back_case_insensitively() {
        for field in CanonicalField::ALL {
            assert_eq!(field.key().parse::<CanonicalField>().unwrap(), field);
        }
        assert_eq!(
            "CALLSTATUS".parse::<CanonicalField>().unwrap(),
            CanonicalField::CallStatus
        );
        assert!("callAttempt".parse::<CanonicalField>().is_err());
    }

    #[test]
    fn serde_uses_camel_case_keys() {
        let json = serde_json::to_string(&CanonicalField::AppointmentComment).unwrap();
        assert_eq!(json, "\"appointmentComment\"");
    }
}
