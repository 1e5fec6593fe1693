use crate::domain::{CallSlot, Contact, ContactId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactListItemDto {
    pub id: ContactId,
    pub row_number: Option<u64>,
    pub display_name: String,
    pub phone: Option<String>,
    pub status: String,
    pub calls_used: usize,
}

impl From<&Contact> for ContactListItemDto {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            row_number: contact.row_number,
            display_name: contact.display_name(),
            phone: contact.phone.clone(),
            status: contact.status.label().to_string(),
            calls_used: contact.calls.used(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedCallDto {
    pub contact_id: ContactId,
    pub slot: CallSlot,
    pub revision: u64,
    pub duration: Option<String>,
}
