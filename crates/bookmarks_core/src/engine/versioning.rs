//! Versioning engine: create, fork-on-update, tombstone-on-delete.
//!
//! # Invariants
//! - Update never edits an active row in place. It allocates a new row that
//!   inherits `channel_id`, `kind`, `sort_order`, `create_at` and `owner_id`,
//!   and tombstones the predecessor at the same instant.
//! - A tombstoned row is never the input of another plan.
//! - Delete tombstones in place and compacts the positions above it.

use crate::engine::ordering;
use crate::model::bookmark::{
    BookmarkId, BookmarkPatch, BookmarkValidationError, ChannelBookmark, NewBookmark,
    UpdateBookmarkResult,
};
use crate::model::change_set::{BookmarkChangeSet, Tombstone};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Versioning plan failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersioningError {
    Invalid(BookmarkValidationError),
    AlreadyDeleted(BookmarkId),
}

impl Display for VersioningError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::AlreadyDeleted(id) => write!(f, "bookmark already deleted: {id}"),
        }
    }
}

impl Error for VersioningError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::AlreadyDeleted(_) => None,
        }
    }
}

impl From<BookmarkValidationError> for VersioningError {
    fn from(value: BookmarkValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Planned create: the new row plus its single-insert change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlan {
    pub bookmark: ChannelBookmark,
    pub changes: BookmarkChangeSet,
}

/// Planned fork: the paired projection plus tombstone+insert change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub result: UpdateBookmarkResult,
    pub changes: BookmarkChangeSet,
}

/// Planned delete: the tombstoned row plus tombstone+compaction change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    pub deleted: ChannelBookmark,
    pub changes: BookmarkChangeSet,
}

/// Builds a new row appended after `active_count` existing active rows.
///
/// # Errors
/// - `Invalid` when the normalized input fails `ChannelBookmark::validate`.
pub fn plan_create(
    input: NewBookmark,
    active_count: usize,
    at: i64,
) -> Result<CreatePlan, VersioningError> {
    let bookmark = ChannelBookmark {
        id: Uuid::new_v4(),
        channel_id: input.channel_id.trim().to_string(),
        owner_id: input.owner_id.map(|value| value.trim().to_string()),
        display_name: input.display_name.trim().to_string(),
        kind: input.kind,
        link_url: non_empty(input.link_url),
        file_id: input.file_id.map(|value| value.trim().to_string()),
        image_url: non_empty(input.image_url),
        emoji: non_empty(input.emoji),
        sort_order: active_count as i64,
        create_at: at,
        update_at: at,
        delete_at: 0,
        original_id: None,
    };
    bookmark.validate()?;

    let mut changes = BookmarkChangeSet::new(bookmark.channel_id.clone(), at);
    changes.inserts.push(bookmark.clone());
    Ok(CreatePlan { bookmark, changes })
}

/// Forks `predecessor` with `patch` applied.
///
/// # Contract
/// - `updated.original_id == Some(deleted.id)`.
/// - `deleted.delete_at == updated.update_at == at`.
///
/// # Errors
/// - `AlreadyDeleted` when `predecessor` is a tombstone.
/// - `Invalid(EmptyPatch)` when `patch` changes nothing.
/// - `Invalid` when the merged row fails validation.
pub fn plan_update(
    predecessor: &ChannelBookmark,
    patch: &BookmarkPatch,
    at: i64,
) -> Result<UpdatePlan, VersioningError> {
    if predecessor.is_deleted() {
        return Err(VersioningError::AlreadyDeleted(predecessor.id));
    }
    if patch.is_empty() {
        return Err(BookmarkValidationError::EmptyPatch.into());
    }

    let updated = ChannelBookmark {
        id: Uuid::new_v4(),
        channel_id: predecessor.channel_id.clone(),
        owner_id: predecessor.owner_id.clone(),
        display_name: match patch.display_name.as_deref() {
            Some(value) => value.trim().to_string(),
            None => predecessor.display_name.clone(),
        },
        kind: predecessor.kind,
        link_url: merge_optional(&patch.link_url, &predecessor.link_url),
        file_id: match patch.file_id.as_deref() {
            Some(value) => Some(value.trim().to_string()),
            None => predecessor.file_id.clone(),
        },
        image_url: merge_optional(&patch.image_url, &predecessor.image_url),
        emoji: merge_optional(&patch.emoji, &predecessor.emoji),
        sort_order: predecessor.sort_order,
        create_at: predecessor.create_at,
        update_at: at,
        delete_at: 0,
        original_id: Some(predecessor.id),
    };
    updated.validate()?;

    let deleted = tombstoned(predecessor, at);
    let mut changes = BookmarkChangeSet::new(predecessor.channel_id.clone(), at);
    changes.tombstones.push(Tombstone {
        bookmark_id: predecessor.id,
        sort_order: predecessor.sort_order,
    });
    changes.inserts.push(updated.clone());

    Ok(UpdatePlan {
        result: UpdateBookmarkResult { updated, deleted },
        changes,
    })
}

/// Tombstones `target` in place and compacts `active` around it.
///
/// `active` is the channel's current active set and may include `target`.
///
/// # Errors
/// - `AlreadyDeleted` when `target` is a tombstone.
pub fn plan_delete(
    target: &ChannelBookmark,
    active: &[ChannelBookmark],
    at: i64,
) -> Result<DeletePlan, VersioningError> {
    if target.is_deleted() {
        return Err(VersioningError::AlreadyDeleted(target.id));
    }

    let mut changes = BookmarkChangeSet::new(target.channel_id.clone(), at);
    changes.tombstones.push(Tombstone {
        bookmark_id: target.id,
        sort_order: target.sort_order,
    });
    changes.moves = ordering::plan_compaction(active, target.id);

    Ok(DeletePlan {
        deleted: tombstoned(target, at),
        changes,
    })
}

fn tombstoned(row: &ChannelBookmark, at: i64) -> ChannelBookmark {
    let mut deleted = row.clone();
    deleted.delete_at = at;
    deleted.update_at = at;
    deleted
}

/// Patch value wins; an empty patch string clears the field.
fn merge_optional(patch: &Option<String>, current: &Option<String>) -> Option<String> {
    match patch {
        Some(value) => non_empty(Some(value.clone())),
        None => current.clone(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{plan_create, plan_delete, plan_update, VersioningError};
    use crate::model::bookmark::{
        BookmarkPatch, BookmarkType, BookmarkValidationError, ChannelBookmark, NewBookmark,
    };

    fn created(sort_order: usize, at: i64) -> ChannelBookmark {
        plan_create(
            NewBookmark::link("channel-1", "Docs", "https://example.com").with_emoji(":book:"),
            sort_order,
            at,
        )
        .unwrap()
        .bookmark
    }

    #[test]
    fn create_appends_and_stamps_times() {
        let plan = plan_create(
            NewBookmark::link(" channel-1 ", "  Docs  ", "https://example.com"),
            3,
            42,
        )
        .unwrap();
        let row = plan.bookmark;
        assert_eq!(row.channel_id, "channel-1");
        assert_eq!(row.display_name, "Docs");
        assert_eq!(row.sort_order, 3);
        assert_eq!((row.create_at, row.update_at, row.delete_at), (42, 42, 0));
        assert_eq!(row.original_id, None);
        assert_eq!(plan.changes.inserts, vec![row]);
        assert_eq!(plan.changes.row_count(), 1);
    }

    #[test]
    fn create_rejects_mismatched_payload() {
        let mut input = NewBookmark::file("channel-1", "Spec", "file-1");
        input.link_url = Some("https://example.com".to_string());
        let err = plan_create(input, 0, 1).unwrap_err();
        assert!(matches!(
            err,
            VersioningError::Invalid(BookmarkValidationError::UnexpectedPayload {
                kind: BookmarkType::File,
                ..
            })
        ));
    }

    #[test]
    fn update_forks_with_inherited_identity_fields() {
        let original = created(2, 10);
        let plan = plan_update(&original, &BookmarkPatch::default().display_name("New"), 20)
            .unwrap();
        let updated = plan.result.updated;
        let deleted = plan.result.deleted;

        assert_ne!(updated.id, original.id);
        assert_eq!(updated.original_id, Some(deleted.id));
        assert_eq!(deleted.id, original.id);
        assert_eq!(updated.display_name, "New");
        assert_eq!(updated.emoji.as_deref(), Some(":book:"));
        assert_eq!(updated.sort_order, 2);
        assert_eq!(updated.create_at, 10);
        assert_eq!(updated.update_at, 20);
        assert_eq!(updated.delete_at, 0);
        assert_eq!(deleted.delete_at, 20);
        assert_eq!(plan.changes.tombstones.len(), 1);
        assert_eq!(plan.changes.inserts.len(), 1);
        assert!(plan.changes.moves.is_empty());
    }

    #[test]
    fn update_clears_emoji_with_empty_string() {
        let original = created(0, 1);
        let plan = plan_update(&original, &BookmarkPatch::default().emoji(""), 2).unwrap();
        assert_eq!(plan.result.updated.emoji, None);
    }

    #[test]
    fn update_rejects_tombstone_empty_patch_and_type_mismatch() {
        let mut original = created(0, 1);

        let err = plan_update(&original, &BookmarkPatch::default(), 2).unwrap_err();
        assert_eq!(
            err,
            VersioningError::Invalid(BookmarkValidationError::EmptyPatch)
        );

        let err = plan_update(&original, &BookmarkPatch::default().file_id("file-9"), 2)
            .unwrap_err();
        assert!(matches!(
            err,
            VersioningError::Invalid(BookmarkValidationError::UnexpectedPayload { .. })
        ));

        original.delete_at = 5;
        let err = plan_update(&original, &BookmarkPatch::default().display_name("x"), 6)
            .unwrap_err();
        assert_eq!(err, VersioningError::AlreadyDeleted(original.id));
    }

    #[test]
    fn delete_tombstones_in_place_and_compacts() {
        let rows: Vec<ChannelBookmark> = (0..4).map(|index| created(index, 1)).collect();
        let plan = plan_delete(&rows[1], &rows, 9).unwrap();

        assert_eq!(plan.deleted.id, rows[1].id);
        assert_eq!(plan.deleted.delete_at, 9);
        assert_eq!(plan.changes.tombstones.len(), 1);
        assert_eq!(plan.changes.moves.len(), 2);
        assert!(plan.changes.inserts.is_empty());

        let err = plan_delete(&plan.deleted, &rows, 10).unwrap_err();
        assert_eq!(err, VersioningError::AlreadyDeleted(rows[1].id));
    }
}
