use crate::error::{IngestError, Result};
use dimicall_core::time::{format_date, format_time};
use dimicall_core::Contact;
use std::io::Write;

/// Column headers of a contact export. Every one of them resolves back to the
/// same field on re-import.
pub const EXPORT_HEADERS: [&str; 14] = [
    "Prénom",
    "Nom",
    "Téléphone",
    "Email",
    "Source",
    "Statut",
    "Commentaire",
    "Date Rappel",
    "Heure Rappel",
    "Date RDV",
    "Heure RDV",
    "Date Appel",
    "Heure Appel",
    "Durée Appel",
];

pub fn write_contacts_csv<W: Write>(writer: W, contacts: &[Contact]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(EXPORT_HEADERS)?;
    for contact in contacts {
        writer.write_record(export_row(contact))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_contacts_csv(contacts: &[Contact]) -> Result<String> {
    let mut buffer = Vec::new();
    write_contacts_csv(&mut buffer, contacts)?;
    String::from_utf8(buffer).map_err(|err| {
        IngestError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}

fn export_row(contact: &Contact) -> [String; 14] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        text(&contact.first_name),
        text(&contact.last_name),
        text(&contact.phone),
        text(&contact.email),
        text(&contact.source),
        contact.status.label().to_string(),
        text(&contact.comment),
        contact.callback.date.map(format_date).unwrap_or_default(),
        contact.callback.time.map(format_time).unwrap_or_default(),
        contact.appointment.date.map(format_date).unwrap_or_default(),
        contact.appointment.time.map(format_time).unwrap_or_default(),
        contact.call_date.map(format_date).unwrap_or_default(),
        contact.call_time.map(format_time).unwrap_or_default(),
        text(&contact.call_duration),
    ]
}
