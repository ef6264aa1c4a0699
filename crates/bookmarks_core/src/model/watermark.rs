//! Sync watermark and delta selection predicate.
//!
//! # Invariants
//! - `since == 0` selects the active set only.
//! - `since > 0` selects every row with any change timestamp after `since`,
//!   active or tombstoned.

use crate::model::bookmark::ChannelBookmark;

/// Client-held sync position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    /// Client holds nothing; answer with the full active set.
    FullSnapshot,
    /// Client is consistent up to and including this epoch ms.
    Since(i64),
}

impl Watermark {
    /// Maps the wire `since` value; zero and negatives mean full snapshot.
    pub fn from_since(since: i64) -> Self {
        if since <= 0 {
            Self::FullSnapshot
        } else {
            Self::Since(since)
        }
    }

    pub fn since(self) -> i64 {
        match self {
            Self::FullSnapshot => 0,
            Self::Since(value) => value,
        }
    }

    /// Selection predicate evaluated against one row snapshot.
    pub fn includes(self, row: &ChannelBookmark) -> bool {
        match self {
            Self::FullSnapshot => row.is_active(),
            Self::Since(since) => {
                row.create_at > since || row.update_at > since || row.delete_at > since
            }
        }
    }
}
