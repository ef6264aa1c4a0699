//! Delta sync engine.
//!
//! # Invariants
//! - Channels without qualifying rows are absent from the result map.
//! - Each returned row satisfies `Watermark::includes`; rows are grouped
//!   per channel with no display-order guarantee for incremental results.

use crate::model::bookmark::ChannelBookmark;
use crate::model::watermark::Watermark;
use crate::repo::bookmark_repo::{BookmarkRepository, RepoResult};
use std::collections::BTreeMap;

/// Per-channel delta keyed by channel id.
pub type ChannelBookmarkMap = BTreeMap<String, Vec<ChannelBookmark>>;

/// Returns rows of `channel_ids` changed after `since` (or the active set
/// when `since == 0`), grouped by channel.
pub fn delta<R: BookmarkRepository + ?Sized>(
    repo: &R,
    channel_ids: &[&str],
    since: i64,
) -> RepoResult<ChannelBookmarkMap> {
    let watermark = Watermark::from_since(since);
    let rows = repo.list_changed(channel_ids, watermark)?;
    Ok(group_by_channel(rows, watermark))
}

/// Returns the delta for one channel as a flat list.
pub fn channel_delta<R: BookmarkRepository + ?Sized>(
    repo: &R,
    channel_id: &str,
    since: i64,
) -> RepoResult<Vec<ChannelBookmark>> {
    Ok(delta(repo, &[channel_id], since)?
        .remove(channel_id)
        .unwrap_or_default())
}

/// Groups rows by channel, dropping any the watermark does not select.
pub fn group_by_channel(rows: Vec<ChannelBookmark>, watermark: Watermark) -> ChannelBookmarkMap {
    let mut grouped = ChannelBookmarkMap::new();
    for row in rows.into_iter().filter(|row| watermark.includes(row)) {
        grouped.entry(row.channel_id.clone()).or_default().push(row);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::group_by_channel;
    use crate::model::bookmark::{BookmarkType, ChannelBookmark};
    use crate::model::watermark::Watermark;
    use uuid::Uuid;

    fn row(channel_id: &str, update_at: i64, delete_at: i64) -> ChannelBookmark {
        ChannelBookmark {
            id: Uuid::new_v4(),
            channel_id: channel_id.to_string(),
            owner_id: None,
            display_name: "n".to_string(),
            kind: BookmarkType::File,
            link_url: None,
            file_id: Some("file".to_string()),
            image_url: None,
            emoji: None,
            sort_order: 0,
            create_at: 1,
            update_at,
            delete_at,
            original_id: None,
        }
    }

    #[test]
    fn grouping_omits_channels_without_selected_rows() {
        let rows = vec![row("a", 1, 0), row("b", 1, 0), row("b", 9, 9)];
        let grouped = group_by_channel(rows, Watermark::Since(5));
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["b"].len(), 1);
        assert!(!grouped.contains_key("a"));
    }

    #[test]
    fn full_snapshot_grouping_keeps_active_rows_per_channel() {
        let rows = vec![row("a", 1, 0), row("a", 2, 0), row("b", 3, 3)];
        let grouped = group_by_channel(rows, Watermark::FullSnapshot);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["a"].len(), 2);
    }
}
