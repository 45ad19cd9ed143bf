//! # echo-chronicle
//!
//! The Chronicle: an append-only log of user-submitted entries, persisted in
//! the `logs` table of a SQLite database.
//!
//! - Entries are never updated or deleted.
//! - Ids are assigned by the store and strictly increase in insertion order.
//! - Reads return the most recent entries oldest-first.

pub mod entry;
pub mod store;

pub use entry::LogEntry;
pub use store::ChronicleStore;
