//! Write plans produced by the ordering and versioning engines.
//!
//! # Invariants
//! - One change set describes one logical mutation of one channel.
//! - Repositories commit a change set entirely or not at all.
//! - Every tombstone and sort move names the state it expects to replace,
//!   so a stale plan is rejected instead of partially applied.

use crate::model::bookmark::{BookmarkId, ChannelBookmark};

/// Position change for one active row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortMove {
    pub bookmark_id: BookmarkId,
    pub from: i64,
    pub to: i64,
}

/// Tombstone write for one active row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    pub bookmark_id: BookmarkId,
    /// Expected current position; the row must still be active there.
    pub sort_order: i64,
}

/// Complete row set of one logical mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkChangeSet {
    pub channel_id: String,
    /// Operation instant. Used for every `update_at`/`delete_at` written.
    pub at: i64,
    pub tombstones: Vec<Tombstone>,
    pub inserts: Vec<ChannelBookmark>,
    pub moves: Vec<SortMove>,
}

impl BookmarkChangeSet {
    pub fn new(channel_id: impl Into<String>, at: i64) -> Self {
        Self {
            channel_id: channel_id.into(),
            at,
            tombstones: Vec::new(),
            inserts: Vec::new(),
            moves: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tombstones.is_empty() && self.inserts.is_empty() && self.moves.is_empty()
    }

    /// Number of row writes this change set performs.
    pub fn row_count(&self) -> usize {
        self.tombstones.len() + self.inserts.len() + self.moves.len()
    }
}
