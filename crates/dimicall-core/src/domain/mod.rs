pub mod calls;
pub mod contact;
pub mod email;
pub mod field;
pub mod ids;
pub mod locks;
pub mod phone;
pub mod status;

pub use calls::{CallHistory, CallSlot, NewCall, SlotClaim, CALL_SLOTS};
pub use contact::{Contact, ScheduledEvent};
pub use email::{looks_like_email, normalize_email};
pub use field::CanonicalField;
pub use ids::{ContactId, ImportRunId};
pub use locks::{ContactGuard, ContactLocks};
pub use phone::{canonicalize_phone, is_canonical_phone};
pub use status::ContactStatus;
