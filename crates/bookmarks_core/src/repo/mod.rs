//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the bookmark persistence contract used by engines and service.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Repository writes enforce `ChannelBookmark::validate()` before SQL.
//! - A change set is committed entirely or not at all.

pub mod bookmark_repo;
