//! Reference storage for Recurra.
//!
//! Holds templates (an amount plus a recurrence rule and its schedule) and
//! the records posted against them.  Post and Skip are transactional: the
//! schedule advance and the new record are persisted together or not at all.

pub mod model;
pub mod persist;
pub mod store;

pub use model::{EntryKind, NewTemplate, PostedRecord, Template};
pub use persist::{JsonFile, Memory, Persistence, Snapshot};
pub use store::{DueEntry, Ledger, PostOutcome, SweepFinding, SweepReason};
