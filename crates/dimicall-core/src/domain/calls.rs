use crate::domain::status::ContactStatus;
use crate::error::CoreError;
use crate::text::non_empty;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of call attempts a contact can hold.
pub const CALL_SLOTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSlot {
    pub index: u8,
    pub date: Option<NaiveDate>,
    pub status: Option<ContactStatus>,
    pub comment: Option<String>,
}

impl CallSlot {
    pub fn empty(index: u8) -> Self {
        Self {
            index,
            date: None,
            status: None,
            comment: None,
        }
    }

    /// A slot is free until it carries a date or a status; a lone comment
    /// does not claim it.
    pub fn is_free(&self) -> bool {
        self.date.is_none() && self.status.is_none()
    }

    fn merge(&mut self, call: &NewCall) {
        if let Some(date) = call.date {
            self.date = Some(date);
        }
        if let Some(status) = call.status {
            self.status = Some(status);
        }
        if let Some(comment) = &call.comment {
            self.comment = Some(comment.clone());
        }
    }
}

/// Data for one more call attempt. Every part is optional, but a call must
/// carry a date or a status to occupy a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCall {
    pub date: Option<NaiveDate>,
    pub status: Option<ContactStatus>,
    pub comment: Option<String>,
}

impl NewCall {
    pub fn new(
        date: Option<NaiveDate>,
        status: Option<ContactStatus>,
        comment: Option<&str>,
    ) -> Self {
        Self {
            date,
            status,
            comment: comment.and_then(non_empty).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.status.is_none()
    }
}

/// A slot chosen against a given revision of the history. Only valid while
/// the history still carries that revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotClaim {
    pub slot: u8,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallHistory {
    slots: [CallSlot; CALL_SLOTS],
    revision: u64,
}

impl Default for CallHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CallHistory {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|i| CallSlot::empty(i as u8 + 1)),
            revision: 0,
        }
    }

    /// Rebuilds a history read back from storage. Slot indexes are taken from
    /// position, not from the values passed in.
    pub fn from_parts(mut slots: [CallSlot; CALL_SLOTS], revision: u64) -> Self {
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.index = i as u8 + 1;
        }
        Self { slots, revision }
    }

    pub fn slots(&self) -> &[CallSlot] {
        &self.slots
    }

    pub fn slot(&self, index: u8) -> Option<&CallSlot> {
        self.slots.get(usize::from(index).checked_sub(1)?)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn used(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }

    pub fn first_free(&self) -> Option<u8> {
        self.slots
            .iter()
            .find(|slot| slot.is_free())
            .map(|slot| slot.index)
    }

    pub fn is_full(&self) -> bool {
        self.first_free().is_none()
    }

    /// Picks the lowest free slot for `call` without touching the history.
    pub fn plan_allocation(&self, call: &NewCall) -> Result<SlotClaim, CoreError> {
        if call.is_empty() {
            return Err(CoreError::EmptyCallRecord);
        }
        let slot = self
            .first_free()
            .ok_or(CoreError::SlotsExhausted(CALL_SLOTS))?;
        Ok(SlotClaim {
            slot,
            revision: self.revision,
        })
    }

    /// Writes `call` into the claimed slot if the history has not moved since
    /// the claim was planned.
    pub fn apply_claim(&mut self, claim: SlotClaim, call: &NewCall) -> Result<u8, CoreError> {
        if claim.revision != self.revision {
            return Err(CoreError::StaleSnapshot {
                expected: claim.revision,
                found: self.revision,
            });
        }
        if call.is_empty() {
            return Err(CoreError::EmptyCallRecord);
        }
        let slot = self
            .slot_mut(claim.slot)
            .ok_or(CoreError::InvalidSlot(claim.slot))?;
        if !slot.is_free() {
            return Err(CoreError::StaleSnapshot {
                expected: claim.revision,
                found: claim.revision,
            });
        }
        slot.merge(call);
        self.revision += 1;
        Ok(claim.slot)
    }

    /// Records one more call attempt in the lowest free slot. Calling this
    /// twice with the same data uses two slots. Fails with `SlotsExhausted`
    /// once all slots are used, leaving the history untouched.
    pub fn allocate(&mut self, call: &NewCall) -> Result<u8, CoreError> {
        let claim = self.plan_allocation(call)?;
        self.apply_claim(claim, call)
    }

    /// Fills a slot from imported columns. Only non-empty parts are written
    /// and the revision is left alone, since nothing has been persisted yet.
    pub fn fill_imported(&mut self, index: u8, call: &NewCall) -> Result<(), CoreError> {
        let slot = self.slot_mut(index).ok_or(CoreError::InvalidSlot(index))?;
        slot.merge(call);
        Ok(())
    }

    fn slot_mut(&mut self, index: u8) -> Option<&mut CallSlot> {
        self.slots.get_mut(usize::from(index).checked_sub(1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{CallHistory, CallSlot, NewCall, SlotClaim, CALL_SLOTS};
    use crate::domain::status::ContactStatus;
    use crate::error::CoreError;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn call(d: u32) -> NewCall {
        NewCall::new(Some(day(d)), Some(ContactStatus::Voicemail), None)
    }

    fn filled(index: u8) -> CallSlot {
        CallSlot {
            index,
            date: Some(day(1)),
            status: Some(ContactStatus::Argued),
            comment: None,
        }
    }

    #[test]
    fn sequential_calls_use_slots_in_order() {
        let mut history = CallHistory::new();
        assert_eq!(history.allocate(&call(1)).unwrap(), 1);
        assert_eq!(history.allocate(&call(2)).unwrap(), 2);
        assert_eq!(history.allocate(&call(3)).unwrap(), 3);
        assert_eq!(history.used(), 3);
        assert_eq!(history.revision(), 3);
        assert_eq!(history.slot(2).unwrap().date, Some(day(2)));
    }

    #[test]
    fn picks_lowest_free_slot() {
        let mut history = CallHistory::from_parts(
            [filled(0), CallSlot::empty(0), CallSlot::empty(0), filled(0)],
            7,
        );
        assert_eq!(history.allocate(&call(5)).unwrap(), 2);
        assert!(history.slot(3).unwrap().is_free());
    }

    #[test]
    fn full_history_is_left_unchanged() {
        let mut history = CallHistory::from_parts([filled(1), filled(2), filled(3), filled(4)], 4);
        let before = history.clone();
        let err = history.allocate(&call(9)).unwrap_err();
        assert_eq!(err, CoreError::SlotsExhausted(CALL_SLOTS));
        assert_eq!(history, before);
    }

    #[test]
    fn comment_alone_does_not_claim_a_slot() {
        let mut history = CallHistory::new();
        let only_comment = NewCall::new(None, None, Some("rappeler lundi"));
        assert_eq!(
            history.allocate(&only_comment).unwrap_err(),
            CoreError::EmptyCallRecord
        );

        let with_status = NewCall::new(None, Some(ContactStatus::CallBack), Some("rappeler lundi"));
        assert_eq!(history.allocate(&with_status).unwrap(), 1);
        let slot = history.slot(1).unwrap();
        assert_eq!(slot.date, None);
        assert_eq!(slot.comment.as_deref(), Some("rappeler lundi"));
    }

    #[test]
    fn blank_comments_are_dropped() {
        let call = NewCall::new(Some(day(1)), None, Some("   "));
        assert_eq!(call.comment, None);
    }

    #[test]
    fn stale_claim_is_rejected() {
        let mut history = CallHistory::new();
        let claim = history.plan_allocation(&call(1)).unwrap();
        assert_eq!(claim, SlotClaim { slot: 1, revision: 0 });

        history.allocate(&call(2)).unwrap();
        let err = history.apply_claim(claim, &call(1)).unwrap_err();
        assert_eq!(
            err,
            CoreError::StaleSnapshot {
                expected: 0,
                found: 1
            }
        );
        assert_eq!(history.slot(1).unwrap().date, Some(day(2)));
    }

    #[test]
    fn imported_slots_keep_revision() {
        let mut history = CallHistory::new();
        history
            .fill_imported(3, &NewCall::new(Some(day(4)), None, None))
            .unwrap();
        assert_eq!(history.revision(), 0);
        assert_eq!(history.first_free(), Some(1));
        assert_eq!(
            history.fill_imported(5, &call(1)).unwrap_err(),
            CoreError::InvalidSlot(5)
        );
    }
}
