//! Pure planning engines composed by the bookmark service.
//!
//! # Responsibility
//! - `ordering`: dense position maintenance and reorder shift planning.
//! - `versioning`: create, fork-on-update and tombstone-on-delete planning.
//! - `sync`: watermark-based delta selection for one or many channels.
//!
//! # Invariants
//! - Planning functions never write; they return change sets that the
//!   repository commits atomically.
//! - A failed check produces an error and no change set.

pub mod ordering;
pub mod sync;
pub mod versioning;
