use crate::error::{Result, StoreError};
use dimicall_core::{
    CallHistory, CallSlot, Contact, ContactId, ContactStatus, ImportRunId, ScheduledEvent,
    CALL_SLOTS,
};
use rusqlite::{named_params, Connection, Row};
use std::str::FromStr;

pub(crate) const CONTACT_COLUMNS: &str = "id, row_number, first_name, last_name, phone, email, source, status, comment,
    callback_date, callback_time, appointment_date, appointment_time, appointment_type,
    appointment_status, appointment_comment, call_date, call_time, call_duration, call_status,
    call_comment, sex, donation, quality, kind, uid,
    call_1_date, call_1_status, call_1_comment, call_2_date, call_2_status, call_2_comment,
    call_3_date, call_3_status, call_3_comment, call_4_date, call_4_status, call_4_comment,
    calls_revision";

pub struct ContactsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> ContactsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, now_utc: i64, run: Option<ImportRunId>, contact: &Contact) -> Result<()> {
        insert_inner(self.conn, now_utc, run, contact)
    }

    /// Inserts a batch atomically: either every contact lands or none does.
    pub fn insert_many(
        &self,
        now_utc: i64,
        run: Option<ImportRunId>,
        contacts: &[Contact],
    ) -> Result<usize> {
        if !self.conn.is_autocommit() {
            for contact in contacts {
                insert_inner(self.conn, now_utc, run, contact)?;
            }
            return Ok(contacts.len());
        }
        let tx = self.conn.unchecked_transaction()?;
        for contact in contacts {
            insert_inner(&tx, now_utc, run, contact)?;
        }
        tx.commit()?;
        Ok(contacts.len())
    }

    pub fn get(&self, id: ContactId) -> Result<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(contact_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Contacts in import order.
    pub fn list(&self, limit: Option<usize>, offset: usize) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             ORDER BY created_at ASC, import_run_id ASC, row_number ASC, id ASC
             LIMIT ?1 OFFSET ?2;"
        );
        let limit = limit
            .and_then(|value| i64::try_from(value).ok())
            .unwrap_or(-1);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([limit, offset])?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            contacts.push(contact_from_row(row)?);
        }
        Ok(contacts)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn insert_inner(
    conn: &Connection,
    now_utc: i64,
    run: Option<ImportRunId>,
    contact: &Contact,
) -> Result<()> {
    let slots = contact.calls.slots();
    conn.execute(
        "INSERT INTO contacts (
            id, import_run_id, row_number, first_name, last_name, phone, email, source, status,
            comment, callback_date, callback_time, appointment_date, appointment_time,
            appointment_type, appointment_status, appointment_comment, call_date, call_time,
            call_duration, call_status, call_comment, sex, donation, quality, kind, uid,
            call_1_date, call_1_status, call_1_comment, call_2_date, call_2_status, call_2_comment,
            call_3_date, call_3_status, call_3_comment, call_4_date, call_4_status, call_4_comment,
            calls_revision, created_at, updated_at
        ) VALUES (
            :id, :run, :row_number, :first_name, :last_name, :phone, :email, :source, :status,
            :comment, :callback_date, :callback_time, :appointment_date, :appointment_time,
            :appointment_type, :appointment_status, :appointment_comment, :call_date, :call_time,
            :call_duration, :call_status, :call_comment, :sex, :donation, :quality, :kind, :uid,
            :c1_date, :c1_status, :c1_comment, :c2_date, :c2_status, :c2_comment,
            :c3_date, :c3_status, :c3_comment, :c4_date, :c4_status, :c4_comment,
            :revision, :now, :now
        );",
        named_params! {
            ":id": contact.id.to_string(),
            ":run": run.map(|id| id.to_string()),
            ":row_number": contact.row_number.and_then(|n| i64::try_from(n).ok()),
            ":first_name": contact.first_name,
            ":last_name": contact.last_name,
            ":phone": contact.phone,
            ":email": contact.email,
            ":source": contact.source,
            ":status": contact.status.as_str(),
            ":comment": contact.comment,
            ":callback_date": contact.callback.date,
            ":callback_time": contact.callback.time,
            ":appointment_date": contact.appointment.date,
            ":appointment_time": contact.appointment.time,
            ":appointment_type": contact.appointment_type,
            ":appointment_status": contact.appointment_status,
            ":appointment_comment": contact.appointment_comment,
            ":call_date": contact.call_date,
            ":call_time": contact.call_time,
            ":call_duration": contact.call_duration,
            ":call_status": contact.call_status.map(ContactStatus::as_str),
            ":call_comment": contact.call_comment,
            ":sex": contact.sex,
            ":donation": contact.donation,
            ":quality": contact.quality,
            ":kind": contact.kind,
            ":uid": contact.uid,
            ":c1_date": slots[0].date,
            ":c1_status": slots[0].status.map(ContactStatus::as_str),
            ":c1_comment": slots[0].comment,
            ":c2_date": slots[1].date,
            ":c2_status": slots[1].status.map(ContactStatus::as_str),
            ":c2_comment": slots[1].comment,
            ":c3_date": slots[2].date,
            ":c3_status": slots[2].status.map(ContactStatus::as_str),
            ":c3_comment": slots[2].comment,
            ":c4_date": slots[3].date,
            ":c4_status": slots[3].status.map(ContactStatus::as_str),
            ":c4_comment": slots[3].comment,
            ":revision": revision_to_sql(contact.calls.revision()),
            ":now": now_utc,
        },
    )?;
    Ok(())
}

pub(crate) fn contact_from_row(row: &Row<'_>) -> Result<Contact> {
    let id_str: String = row.get("id")?;
    let id = ContactId::from_str(&id_str).map_err(|_| StoreError::InvalidId(id_str.clone()))?;
    let row_number: Option<i64> = row.get("row_number")?;
    let status: Option<String> = row.get("status")?;
    Ok(Contact {
        id,
        row_number: row_number.and_then(|n| u64::try_from(n).ok()),
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        source: row.get("source")?,
        status: stored_status("status", status)?.unwrap_or_default(),
        comment: row.get("comment")?,
        callback: ScheduledEvent {
            date: row.get("callback_date")?,
            time: row.get("callback_time")?,
        },
        appointment: ScheduledEvent {
            date: row.get("appointment_date")?,
            time: row.get("appointment_time")?,
        },
        appointment_type: row.get("appointment_type")?,
        appointment_status: row.get("appointment_status")?,
        appointment_comment: row.get("appointment_comment")?,
        call_date: row.get("call_date")?,
        call_time: row.get("call_time")?,
        call_duration: row.get("call_duration")?,
        call_status: stored_status("call_status", row.get("call_status")?)?,
        call_comment: row.get("call_comment")?,
        sex: row.get("sex")?,
        donation: row.get("donation")?,
        quality: row.get("quality")?,
        kind: row.get("kind")?,
        uid: row.get("uid")?,
        calls: history_from_row(row)?,
    })
}

pub(crate) fn history_from_row(row: &Row<'_>) -> Result<CallHistory> {
    const COLUMNS: [[&str; 3]; CALL_SLOTS] = [
        ["call_1_date", "call_1_status", "call_1_comment"],
        ["call_2_date", "call_2_status", "call_2_comment"],
        ["call_3_date", "call_3_status", "call_3_comment"],
        ["call_4_date", "call_4_status", "call_4_comment"],
    ];
    let mut slots: [CallSlot; CALL_SLOTS] = std::array::from_fn(|i| CallSlot::empty(i as u8 + 1));
    for (slot, [date, status, comment]) in slots.iter_mut().zip(COLUMNS) {
        slot.date = row.get(date)?;
        slot.status = stored_status(status, row.get(status)?)?;
        slot.comment = row.get(comment)?;
    }
    let revision: i64 = row.get("calls_revision")?;
    Ok(CallHistory::from_parts(
        slots,
        u64::try_from(revision).unwrap_or(0),
    ))
}

pub(crate) fn revision_to_sql(revision: u64) -> i64 {
    i64::try_from(revision).unwrap_or(i64::MAX)
}

fn stored_status(column: &'static str, raw: Option<String>) -> Result<Option<ContactStatus>> {
    match raw {
        None => Ok(None),
        Some(value) => ContactStatus::parse(&value)
            .map(Some)
            .ok_or(StoreError::InvalidData { column, value }),
    }
}
