//! Dense ordering engine.
//!
//! # Invariants
//! - Active positions of one channel form exactly `0..n`.
//! - Plans only contain rows whose position actually changes.
//! - Display order is `sort_order ASC, create_at ASC, id ASC`; ties only
//!   appear in legacy data and are resolved by the same key when repairing.

use crate::model::bookmark::{BookmarkId, ChannelBookmark};
use crate::model::change_set::SortMove;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reorder planning failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    /// Target is absent from the channel's active rows.
    NotFound(BookmarkId),
    /// Target index outside `0..active_count`.
    OutOfRange { new_index: i64, active_count: usize },
}

impl Display for OrderingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "active bookmark not found in channel: {id}"),
            Self::OutOfRange {
                new_index,
                active_count,
            } => write!(
                f,
                "sort index {new_index} is out of range for {active_count} bookmarks"
            ),
        }
    }
}

impl Error for OrderingError {}

/// Sorts rows into display order in place.
pub fn sort_for_display(rows: &mut [ChannelBookmark]) {
    rows.sort_by_key(display_key);
}

/// Returns whether active rows occupy exactly positions `0..n`.
pub fn is_dense(rows: &[ChannelBookmark]) -> bool {
    let mut positions: Vec<i64> = rows
        .iter()
        .filter(|row| row.is_active())
        .map(|row| row.sort_order)
        .collect();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i64)
}

/// Plans moving `bookmark_id` to `new_index` among the active rows.
///
/// Moving down shifts `(old, new]` up by one; moving up shifts `[new, old)`
/// down by one. Moving to the current index yields an empty plan.
///
/// # Errors
/// - `NotFound` when the target is not an active row of `active`.
/// - `OutOfRange` when `new_index` is negative or `>= active_count`.
pub fn plan_reorder(
    active: &[ChannelBookmark],
    bookmark_id: BookmarkId,
    new_index: i64,
) -> Result<Vec<SortMove>, OrderingError> {
    let mut ordered = display_ordered(active);
    let old_index = ordered
        .iter()
        .position(|row| row.id == bookmark_id)
        .ok_or(OrderingError::NotFound(bookmark_id))?;

    if new_index < 0 || new_index >= ordered.len() as i64 {
        return Err(OrderingError::OutOfRange {
            new_index,
            active_count: ordered.len(),
        });
    }

    let target = ordered.remove(old_index);
    ordered.insert(new_index as usize, target);
    Ok(moves_to_dense(&ordered))
}

/// Plans closing the gap left by removing `removed_id` from `active`.
///
/// Every remaining row above the removed position moves down by one.
pub fn plan_compaction(active: &[ChannelBookmark], removed_id: BookmarkId) -> Vec<SortMove> {
    let remaining: Vec<ChannelBookmark> = active
        .iter()
        .filter(|row| row.id != removed_id)
        .cloned()
        .collect();
    plan_repair(&remaining)
}

/// Plans renumbering active rows to `0..n` while keeping display order.
pub fn plan_repair(active: &[ChannelBookmark]) -> Vec<SortMove> {
    moves_to_dense(&display_ordered(active))
}

fn display_ordered(rows: &[ChannelBookmark]) -> Vec<&ChannelBookmark> {
    let mut ordered: Vec<&ChannelBookmark> = rows.iter().filter(|row| row.is_active()).collect();
    ordered.sort_by_key(|row| display_key(row));
    ordered
}

fn display_key(row: &ChannelBookmark) -> (i64, i64, BookmarkId) {
    (row.sort_order, row.create_at, row.id)
}

fn moves_to_dense(ordered: &[&ChannelBookmark]) -> Vec<SortMove> {
    ordered
        .iter()
        .enumerate()
        .filter(|(index, row)| row.sort_order != *index as i64)
        .map(|(index, row)| SortMove {
            bookmark_id: row.id,
            from: row.sort_order,
            to: index as i64,
        })
        .collect()
}
