use crate::domain::calls::{CallHistory, NewCall};
use crate::domain::field::CanonicalField;
use crate::domain::ids::ContactId;
use crate::domain::status::ContactStatus;
use crate::error::CoreError;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A date with an optional time of day, e.g. a callback or an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl ScheduledEvent {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub row_number: Option<u64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub status: ContactStatus,
    pub comment: Option<String>,
    pub callback: ScheduledEvent,
    pub appointment: ScheduledEvent,
    pub appointment_type: Option<String>,
    pub appointment_status: Option<String>,
    pub appointment_comment: Option<String>,
    pub call_date: Option<NaiveDate>,
    pub call_time: Option<NaiveTime>,
    pub call_duration: Option<String>,
    pub call_status: Option<ContactStatus>,
    pub call_comment: Option<String>,
    pub sex: Option<String>,
    pub donation: Option<String>,
    pub quality: Option<String>,
    pub kind: Option<String>,
    pub uid: Option<String>,
    pub calls: CallHistory,
}

impl Contact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_field(&self, field: CanonicalField) -> bool {
        match field {
            CanonicalField::FirstName => self.first_name.is_some(),
            CanonicalField::LastName => self.last_name.is_some(),
            CanonicalField::Phone => self.phone.is_some(),
            CanonicalField::Email => self.email.is_some(),
            CanonicalField::Source => self.source.is_some(),
            CanonicalField::Status => self.status != ContactStatus::Undefined,
            CanonicalField::Comment => self.comment.is_some(),
            CanonicalField::CallbackDate => self.callback.date.is_some(),
            CanonicalField::CallbackTime => self.callback.time.is_some(),
            CanonicalField::AppointmentDate => self.appointment.date.is_some(),
            CanonicalField::AppointmentTime => self.appointment.time.is_some(),
            CanonicalField::AppointmentType => self.appointment_type.is_some(),
            CanonicalField::AppointmentStatus => self.appointment_status.is_some(),
            CanonicalField::AppointmentComment => self.appointment_comment.is_some(),
            CanonicalField::CallDate => self.call_date.is_some(),
            CanonicalField::CallTime => self.call_time.is_some(),
            CanonicalField::CallDuration => self.call_duration.is_some(),
            CanonicalField::CallStatus => self.call_status.is_some(),
            CanonicalField::CallComment => self.call_comment.is_some(),
            CanonicalField::Sex => self.sex.is_some(),
            CanonicalField::Donation => self.donation.is_some(),
            CanonicalField::Quality => self.quality.is_some(),
            CanonicalField::Kind => self.kind.is_some(),
            CanonicalField::Uid => self.uid.is_some(),
        }
    }

    pub fn missing_required(&self) -> Vec<CanonicalField> {
        CanonicalField::REQUIRED
            .into_iter()
            .filter(|field| !self.has_field(*field))
            .collect()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingRequiredFields(missing))
        }
    }

    /// Records one more call attempt; see [`CallHistory::allocate`].
    pub fn record_call(&mut self, call: &NewCall) -> Result<u8, CoreError> {
        self.calls.allocate(call)
    }
}

#[cfg(test)]
mod tests {
    use super::{Contact, ScheduledEvent};
    use crate::domain::field::CanonicalField;
    use crate::error::CoreError;
    use chrono::NaiveTime;

    #[test]
    fn an_event_with_only_a_time_is_not_empty() {
        assert!(ScheduledEvent::default().is_empty());
        let event = ScheduledEvent {
            date: None,
            time: NaiveTime::from_hms_opt(14, 30, 0),
        };
        assert!(!event.is_empty());
    }

    #[test]
    fn validate_reports_every_missing_required_field() {
        let contact = Contact {
            last_name: Some("Martin".into()),
            ..Contact::new()
        };
        assert_eq!(
            contact.validate().unwrap_err(),
            CoreError::MissingRequiredFields(vec![
                CanonicalField::FirstName,
                CanonicalField::Phone
            ])
        );
    }

    #[test]
    fn display_name_skips_missing_parts() {
        let contact = Contact {
            first_name: Some("Jean".into()),
            ..Contact::new()
        };
        assert_eq!(contact.display_name(), "Jean");
    }
}
