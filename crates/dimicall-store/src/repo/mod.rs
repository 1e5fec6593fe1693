pub mod calls;
pub mod contacts;
pub mod import_runs;

pub use calls::{CallsRepo, RecordedCall, MAX_ATTEMPTS};
pub use contacts::ContactsRepo;
pub use import_runs::{ImportRun, ImportRunsRepo};
