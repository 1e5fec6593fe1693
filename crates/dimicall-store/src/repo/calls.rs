use crate::error::{Result, StoreError};
use crate::repo::contacts::{history_from_row, revision_to_sql};
use dimicall_core::time::CallDuration;
use dimicall_core::{CallHistory, CallSlot, ContactId, ContactStatus, CoreError, NewCall, CALL_SLOTS};
use rusqlite::{params, Connection};

/// Optimistic write attempts before `record_call` reports a conflict.
pub const MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub slot: CallSlot,
    /// Call history revision after the write.
    pub revision: u64,
    pub attempts: usize,
}

pub struct CallsRepo<'a> {
    conn: &'a Connection,
}

impl<'a> CallsRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn history(&self, id: ContactId) -> Result<Option<CallHistory>> {
        let mut stmt = self.conn.prepare(
            "SELECT call_1_date, call_1_status, call_1_comment,
                    call_2_date, call_2_status, call_2_comment,
                    call_3_date, call_3_status, call_3_comment,
                    call_4_date, call_4_status, call_4_comment,
                    calls_revision
             FROM contacts WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(history_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Writes `call` into the contact's lowest free slot.
    ///
    /// The slot is chosen from a snapshot and committed with a conditional
    /// update on the snapshot's revision, so concurrent recorders never share
    /// a slot. A lost race re-reads and retries up to [`MAX_ATTEMPTS`] times.
    pub fn record_call(&self, now_utc: i64, id: ContactId, call: &NewCall) -> Result<RecordedCall> {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut history = self
                .history(id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let claim = history.plan_allocation(call)?;
            let index = history.apply_claim(claim, call)?;
            let slot = history
                .slot(index)
                .cloned()
                .ok_or(CoreError::InvalidSlot(index))?;

            if self.commit_slot(now_utc, id, &slot, claim.revision)? {
                tracing::debug!(contact = %id, slot = index, attempt, "recorded call");
                return Ok(RecordedCall {
                    slot,
                    revision: history.revision(),
                    attempts: attempt,
                });
            }
            tracing::debug!(contact = %id, slot = index, attempt, "call history moved, retrying");
        }
        tracing::warn!(contact = %id, attempts = MAX_ATTEMPTS, "giving up on call recording");
        Err(StoreError::Conflict {
            contact: id,
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Stores `slot` only if the history is still at `expected_revision` and
    /// the slot is still free. Returns whether the row was written.
    pub fn commit_slot(
        &self,
        now_utc: i64,
        id: ContactId,
        slot: &CallSlot,
        expected_revision: u64,
    ) -> Result<bool> {
        let sql = slot_update_sql(slot.index).ok_or(CoreError::InvalidSlot(slot.index))?;
        let updated = self.conn.execute(
            &sql,
            params![
                slot.date,
                slot.status.map(ContactStatus::as_str),
                slot.comment,
                now_utc,
                id.to_string(),
                revision_to_sql(expected_revision),
            ],
        )?;
        Ok(updated == 1)
    }

    pub fn set_duration(&self, now_utc: i64, id: ContactId, duration: &CallDuration) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE contacts SET call_duration = ?1, updated_at = ?2 WHERE id = ?3;",
            params![duration.to_string(), now_utc, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn slot_update_sql(index: u8) -> Option<String> {
    if index == 0 || usize::from(index) > CALL_SLOTS {
        return None;
    }
    Some(format!(
        "UPDATE contacts
         SET call_{index}_date = ?1, call_{index}_status = ?2, call_{index}_comment = ?3,
             calls_revision = calls_revision + 1, updated_at = ?4
         WHERE id = ?5 AND calls_revision = ?6
           AND call_{index}_date IS NULL AND call_{index}_status IS NULL;"
    ))
}

#[cfg(test)]
mod tests {
    use super::slot_update_sql;

    #[test]
    fn slot_sql_only_for_known_slots() {
        assert!(slot_update_sql(0).is_none());
        assert!(slot_update_sql(5).is_none());
        let sql = slot_update_sql(3).unwrap();
        assert!(sql.contains("call_3_status = ?2"));
        assert!(sql.contains("calls_revision = ?6"));
    }
}
