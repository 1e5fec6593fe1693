use chrono::NaiveDate;
use dimicall_core::time::CallDuration;
use dimicall_core::{Contact, ContactId, ContactStatus, CoreError, NewCall};
use dimicall_store::{Store, StoreError, StoreErrorKind};
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

const NOW: i64 = 1_700_000_000;

fn seeded(store: &Store) -> ContactId {
    store.migrate().expect("migrate");
    let contact = Contact {
        first_name: Some("Jean".to_string()),
        last_name: Some("Dupont".to_string()),
        phone: Some("+33 6 12 34 56 78".to_string()),
        ..Contact::new()
    };
    store.contacts().insert(NOW, None, &contact).expect("insert");
    contact.id
}

fn call(day: u32, status: ContactStatus) -> NewCall {
    NewCall::new(NaiveDate::from_ymd_opt(2024, 3, day), Some(status), None)
}

#[test]
fn sequential_calls_fill_slots_in_order_then_exhaust() {
    let store = Store::open_in_memory().expect("open");
    let id = seeded(&store);

    for (expected, day) in [(1, 1), (2, 2), (3, 3), (4, 4)] {
        let recorded = store
            .calls()
            .record_call(NOW, id, &call(day, ContactStatus::Voicemail))
            .expect("record call");
        assert_eq!(recorded.slot.index, expected);
        assert_eq!(recorded.revision, u64::from(expected));
        assert_eq!(recorded.attempts, 1);
    }

    let before = store.calls().history(id).expect("history").expect("exists");
    let err = store
        .calls()
        .record_call(NOW, id, &call(5, ContactStatus::Argued))
        .unwrap_err();
    assert!(matches!(err, StoreError::Core(CoreError::SlotsExhausted(4))));
    let after = store.calls().history(id).expect("history").expect("exists");
    assert_eq!(before, after);
}

#[test]
fn lowest_free_slot_is_used_after_imported_gaps() {
    let store = Store::open_in_memory().expect("open");
    store.migrate().expect("migrate");
    let mut contact = Contact::new();
    contact
        .calls
        .fill_imported(1, &call(1, ContactStatus::Voicemail))
        .expect("fill 1");
    contact
        .calls
        .fill_imported(4, &call(4, ContactStatus::Voicemail))
        .expect("fill 4");
    store.contacts().insert(NOW, None, &contact).expect("insert");

    let recorded = store
        .calls()
        .record_call(NOW, contact.id, &call(9, ContactStatus::CallBack))
        .expect("record");
    assert_eq!(recorded.slot.index, 2);
}

#[test]
fn stale_revision_is_not_committed() {
    let store = Store::open_in_memory().expect("open");
    let id = seeded(&store);
    let history = store.calls().history(id).expect("history").expect("exists");
    let claim = history
        .plan_allocation(&call(1, ContactStatus::Voicemail))
        .expect("plan");

    store
        .calls()
        .record_call(NOW, id, &call(2, ContactStatus::Argued))
        .expect("competing write");

    let mut local = history.clone();
    local
        .apply_claim(claim, &call(1, ContactStatus::Voicemail))
        .expect("apply locally");
    let slot = local.slot(claim.slot).cloned().expect("slot");
    let written = store
        .calls()
        .commit_slot(NOW, id, &slot, claim.revision)
        .expect("commit");
    assert!(!written);
}

#[test]
fn unknown_contact_is_not_found() {
    let store = Store::open_in_memory().expect("open");
    store.migrate().expect("migrate");
    let err = store
        .calls()
        .record_call(NOW, ContactId::new(), &call(1, ContactStatus::Voicemail))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
}

#[test]
fn duration_is_stored_formatted() {
    let store = Store::open_in_memory().expect("open");
    let id = seeded(&store);
    store
        .calls()
        .set_duration(NOW, id, &CallDuration::from_seconds(3_725))
        .expect("set duration");
    let contact = store.contacts().get(id).expect("get").expect("exists");
    assert_eq!(contact.call_duration.as_deref(), Some("01:02:05"));
}

#[test]
fn concurrent_recorders_never_share_a_slot() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("dimicall.sqlite3");
    let id = {
        let store = Store::open(&path).expect("open");
        seeded(&store)
    };

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4u32)
        .map(|n| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = Store::open(&path).expect("open");
                barrier.wait();
                store
                    .calls()
                    .record_call(NOW, id, &call(n + 1, ContactStatus::Voicemail))
                    .expect("record")
                    .slot
                    .index
            })
        })
        .collect();

    let slots: BTreeSet<u8> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread"))
        .collect();
    assert_eq!(slots, BTreeSet::from([1, 2, 3, 4]));

    let store = Store::open(&path).expect("open");
    let history = store.calls().history(id).expect("history").expect("exists");
    assert!(history.is_full());
    assert_eq!(history.revision(), 4);
}
