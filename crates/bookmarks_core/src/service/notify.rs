//! Post-commit bookmark events.
//!
//! # Invariants
//! - One event per committed mutation, published after commit.
//! - Events of one channel are published in commit order.

use crate::model::bookmark::{ChannelBookmark, UpdateBookmarkResult};
use serde::Serialize;

/// Committed bookmark mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum BookmarkEvent {
    #[serde(rename = "channel_bookmark_created")]
    Created { bookmark: ChannelBookmark },
    #[serde(rename = "channel_bookmark_updated")]
    Updated {
        updated: ChannelBookmark,
        deleted: ChannelBookmark,
    },
    #[serde(rename = "channel_bookmark_deleted")]
    Deleted { bookmark: ChannelBookmark },
    #[serde(rename = "channel_bookmark_sorted")]
    Sorted {
        channel_id: String,
        bookmarks: Vec<ChannelBookmark>,
    },
}

impl BookmarkEvent {
    pub fn updated(result: &UpdateBookmarkResult) -> Self {
        Self::Updated {
            updated: result.updated.clone(),
            deleted: result.deleted.clone(),
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            Self::Created { bookmark } | Self::Deleted { bookmark } => &bookmark.channel_id,
            Self::Updated { updated, .. } => &updated.channel_id,
            Self::Sorted { channel_id, .. } => channel_id,
        }
    }

    /// Stable event name used on the wire and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "channel_bookmark_created",
            Self::Updated { .. } => "channel_bookmark_updated",
            Self::Deleted { .. } => "channel_bookmark_deleted",
            Self::Sorted { .. } => "channel_bookmark_sorted",
        }
    }
}

/// Receiver of committed bookmark events.
///
/// Called while the channel's writer section is still held; implementations
/// should hand off to their transport and return promptly.
pub trait BookmarkNotifier: Send + Sync {
    fn notify(&self, event: &BookmarkEvent);
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl BookmarkNotifier for NoopNotifier {
    fn notify(&self, _event: &BookmarkEvent) {}
}
