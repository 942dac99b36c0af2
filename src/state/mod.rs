//! State tracker: the persisted applied-record and its SQLite-backed store.
//!
//! Layout:
//! - `record.rs`: the `AppliedRecord` model
//! - `schema.rs`: SQL DDL for initializing the database
//! - `store.rs`: load/save over a sqlite pool

mod record;
mod schema;
mod store;

pub use record::{AppliedRecord, ApplyOutcome};
pub use schema::SQLITE_INIT;
pub use store::StateStore;
