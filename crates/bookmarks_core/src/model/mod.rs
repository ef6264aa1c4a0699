//! Domain model for channel bookmarks.
//!
//! # Responsibility
//! - Define the bookmark record and its create/patch inputs.
//! - Describe one logical mutation as a complete change set.
//! - Describe sync watermarks and their row selection predicate.
//!
//! # Invariants
//! - Every bookmark row is identified by a stable `BookmarkId`.
//! - Deletion is represented by `delete_at` tombstones, not hard delete.

pub mod bookmark;
pub mod change_set;
pub mod watermark;
