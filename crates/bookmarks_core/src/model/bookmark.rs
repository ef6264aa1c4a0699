//! Channel bookmark domain model.
//!
//! # Responsibility
//! - Define the canonical bookmark row shared by storage, engines and callers.
//! - Validate the `type`/payload pairing and field limits.
//!
//! # Invariants
//! - `kind == Link` iff `link_url` is set; `kind == File` iff `file_id` is set.
//! - `delete_at == 0` means active; a tombstoned row never changes again.
//! - `original_id` links a forked row to the row it superseded.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one bookmark row.
///
/// A fork allocates a new id; the predecessor keeps its own as a tombstone.
pub type BookmarkId = Uuid;

pub const MAX_DISPLAY_NAME_CHARS: usize = 64;
pub const MAX_EMOJI_CHARS: usize = 64;
pub const MAX_URL_CHARS: usize = 1024;

static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/?#]+[^\s]*$").expect("valid http url regex"));

/// Bookmark payload kind. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkType {
    /// Points at an external URL stored in `link_url`.
    Link,
    /// Points at an uploaded file referenced by `file_id`.
    File,
}

impl BookmarkType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "link" => Some(Self::Link),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// One persisted bookmark row, active or tombstoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBookmark {
    pub id: BookmarkId,
    /// Owning channel. Never changes after creation.
    pub channel_id: String,
    /// Creating principal, when known.
    pub owner_id: Option<String>,
    pub display_name: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: BookmarkType,
    pub link_url: Option<String>,
    pub file_id: Option<String>,
    /// Optional preview image for link bookmarks.
    pub image_url: Option<String>,
    pub emoji: Option<String>,
    /// Zero-based position among active rows of the channel.
    pub sort_order: i64,
    /// Epoch ms. Preserved across forks.
    pub create_at: i64,
    /// Epoch ms of the latest write to this exact row.
    pub update_at: i64,
    /// Epoch ms tombstone marker; `0` while active.
    pub delete_at: i64,
    /// Row this one superseded via fork.
    pub original_id: Option<BookmarkId>,
}

impl ChannelBookmark {
    /// Returns whether this row is part of the channel's visible list.
    pub fn is_active(&self) -> bool {
        self.delete_at == 0
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at > 0
    }

    /// Validates payload pairing, field limits and timestamp ordering.
    ///
    /// # Errors
    /// - Returns the first violated rule as `BookmarkValidationError`.
    pub fn validate(&self) -> Result<(), BookmarkValidationError> {
        if self.channel_id.trim().is_empty() {
            return Err(BookmarkValidationError::BlankChannelId);
        }
        if matches!(self.owner_id.as_deref(), Some(owner) if owner.trim().is_empty()) {
            return Err(BookmarkValidationError::BlankOwnerId);
        }
        validate_display_name(&self.display_name)?;
        if let Some(emoji) = self.emoji.as_deref() {
            let actual = emoji.chars().count();
            if actual > MAX_EMOJI_CHARS {
                return Err(BookmarkValidationError::EmojiTooLong {
                    max: MAX_EMOJI_CHARS,
                    actual,
                });
            }
        }
        validate_payload(
            self.kind,
            self.link_url.as_deref(),
            self.file_id.as_deref(),
        )?;
        if let Some(image_url) = self.image_url.as_deref() {
            validate_http_url("image_url", image_url)?;
        }
        if self.sort_order < 0 {
            return Err(BookmarkValidationError::NegativeSortOrder(self.sort_order));
        }
        if self.create_at < 0 || self.update_at < self.create_at || self.delete_at < 0 {
            return Err(BookmarkValidationError::InvalidTimestamps {
                create_at: self.create_at,
                update_at: self.update_at,
                delete_at: self.delete_at,
            });
        }
        if self.original_id == Some(self.id) {
            return Err(BookmarkValidationError::SelfReferencingOriginal(self.id));
        }
        Ok(())
    }
}

/// Caller input for creating one bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub channel_id: String,
    pub owner_id: Option<String>,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: BookmarkType,
    pub link_url: Option<String>,
    pub file_id: Option<String>,
    pub image_url: Option<String>,
    pub emoji: Option<String>,
}

impl NewBookmark {
    /// Link bookmark input with no owner, emoji or preview image.
    pub fn link(
        channel_id: impl Into<String>,
        display_name: impl Into<String>,
        link_url: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            owner_id: None,
            display_name: display_name.into(),
            kind: BookmarkType::Link,
            link_url: Some(link_url.into()),
            file_id: None,
            image_url: None,
            emoji: None,
        }
    }

    /// File bookmark input with no owner or emoji.
    pub fn file(
        channel_id: impl Into<String>,
        display_name: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            owner_id: None,
            display_name: display_name.into(),
            kind: BookmarkType::File,
            link_url: None,
            file_id: Some(file_id.into()),
            image_url: None,
            emoji: None,
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Partial update applied on top of the predecessor row.
///
/// `None` keeps the predecessor's value. `emoji: Some("")` clears the emoji.
/// Type and channel are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkPatch {
    pub display_name: Option<String>,
    pub link_url: Option<String>,
    pub file_id: Option<String>,
    pub image_url: Option<String>,
    pub emoji: Option<String>,
}

impl BookmarkPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.link_url.is_none()
            && self.file_id.is_none()
            && self.image_url.is_none()
            && self.emoji.is_none()
    }

    pub fn display_name(mut self, value: impl Into<String>) -> Self {
        self.display_name = Some(value.into());
        self
    }

    pub fn link_url(mut self, value: impl Into<String>) -> Self {
        self.link_url = Some(value.into());
        self
    }

    pub fn file_id(mut self, value: impl Into<String>) -> Self {
        self.file_id = Some(value.into());
        self
    }

    pub fn image_url(mut self, value: impl Into<String>) -> Self {
        self.image_url = Some(value.into());
        self
    }

    pub fn emoji(mut self, value: impl Into<String>) -> Self {
        self.emoji = Some(value.into());
        self
    }
}

/// Paired result of a fork: the new active row and its tombstoned predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBookmarkResult {
    pub updated: ChannelBookmark,
    pub deleted: ChannelBookmark,
}

/// Rule violations for bookmark rows and inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkValidationError {
    BlankChannelId,
    BlankOwnerId,
    BlankDisplayName,
    DisplayNameTooLong { max: usize, actual: usize },
    EmojiTooLong { max: usize, actual: usize },
    /// `Link` bookmark without `link_url`.
    MissingLinkUrl,
    /// `File` bookmark without `file_id`.
    MissingFileId,
    /// Payload field set that does not belong to this bookmark type.
    UnexpectedPayload {
        kind: BookmarkType,
        field: &'static str,
    },
    InvalidUrl { field: &'static str },
    UrlTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    NegativeSortOrder(i64),
    InvalidTimestamps {
        create_at: i64,
        update_at: i64,
        delete_at: i64,
    },
    SelfReferencingOriginal(BookmarkId),
    /// Update request carried no field to change.
    EmptyPatch,
    /// Channel already holds the configured maximum of active bookmarks.
    ChannelLimitReached { channel_id: String, limit: usize },
}

impl Display for BookmarkValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankChannelId => write!(f, "channel id must not be blank"),
            Self::BlankOwnerId => write!(f, "owner id must not be blank when set"),
            Self::BlankDisplayName => write!(f, "display name must not be blank"),
            Self::DisplayNameTooLong { max, actual } => {
                write!(f, "display name has {actual} characters; max is {max}")
            }
            Self::EmojiTooLong { max, actual } => {
                write!(f, "emoji has {actual} characters; max is {max}")
            }
            Self::MissingLinkUrl => write!(f, "link bookmark requires link_url"),
            Self::MissingFileId => write!(f, "file bookmark requires file_id"),
            Self::UnexpectedPayload { kind, field } => {
                write!(f, "{} bookmark must not set {field}", kind.as_str())
            }
            Self::InvalidUrl { field } => write!(f, "{field} must be an absolute http(s) url"),
            Self::UrlTooLong { field, max, actual } => {
                write!(f, "{field} has {actual} characters; max is {max}")
            }
            Self::NegativeSortOrder(value) => write!(f, "sort order must be >= 0, got {value}"),
            Self::InvalidTimestamps {
                create_at,
                update_at,
                delete_at,
            } => write!(
                f,
                "invalid timestamps create_at={create_at} update_at={update_at} delete_at={delete_at}"
            ),
            Self::SelfReferencingOriginal(id) => {
                write!(f, "bookmark {id} cannot reference itself as original")
            }
            Self::EmptyPatch => write!(f, "update patch has no fields"),
            Self::ChannelLimitReached { channel_id, limit } => write!(
                f,
                "channel {channel_id} already has the maximum of {limit} bookmarks"
            ),
        }
    }
}

impl Error for BookmarkValidationError {}

fn validate_display_name(value: &str) -> Result<(), BookmarkValidationError> {
    if value.trim().is_empty() {
        return Err(BookmarkValidationError::BlankDisplayName);
    }
    let actual = value.chars().count();
    if actual > MAX_DISPLAY_NAME_CHARS {
        return Err(BookmarkValidationError::DisplayNameTooLong {
            max: MAX_DISPLAY_NAME_CHARS,
            actual,
        });
    }
    Ok(())
}

fn validate_payload(
    kind: BookmarkType,
    link_url: Option<&str>,
    file_id: Option<&str>,
) -> Result<(), BookmarkValidationError> {
    match kind {
        BookmarkType::Link => {
            if file_id.is_some() {
                return Err(BookmarkValidationError::UnexpectedPayload {
                    kind,
                    field: "file_id",
                });
            }
            let url = link_url.ok_or(BookmarkValidationError::MissingLinkUrl)?;
            validate_http_url("link_url", url)
        }
        BookmarkType::File => {
            if link_url.is_some() {
                return Err(BookmarkValidationError::UnexpectedPayload {
                    kind,
                    field: "link_url",
                });
            }
            match file_id {
                Some(id) if !id.trim().is_empty() => Ok(()),
                _ => Err(BookmarkValidationError::MissingFileId),
            }
        }
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), BookmarkValidationError> {
    let actual = value.chars().count();
    if actual > MAX_URL_CHARS {
        return Err(BookmarkValidationError::UrlTooLong {
            field,
            max: MAX_URL_CHARS,
            actual,
        });
    }
    if !HTTP_URL_RE.is_match(value) {
        return Err(BookmarkValidationError::InvalidUrl { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BookmarkType, BookmarkValidationError, ChannelBookmark, MAX_DISPLAY_NAME_CHARS};
    use uuid::Uuid;

    fn link_row() -> ChannelBookmark {
        ChannelBookmark {
            id: Uuid::new_v4(),
            channel_id: "channel-1".to_string(),
            owner_id: Some("user-1".to_string()),
            display_name: "Docs".to_string(),
            kind: BookmarkType::Link,
            link_url: Some("https://example.com/docs".to_string()),
            file_id: None,
            image_url: None,
            emoji: Some(":book:".to_string()),
            sort_order: 0,
            create_at: 10,
            update_at: 10,
            delete_at: 0,
            original_id: None,
        }
    }

    #[test]
    fn valid_link_row_passes() {
        assert_eq!(link_row().validate(), Ok(()));
    }

    #[test]
    fn link_row_rejects_file_id() {
        let mut row = link_row();
        row.file_id = Some("file-1".to_string());
        assert_eq!(
            row.validate(),
            Err(BookmarkValidationError::UnexpectedPayload {
                kind: BookmarkType::Link,
                field: "file_id"
            })
        );
    }

    #[test]
    fn file_row_requires_file_id_and_rejects_link_url() {
        let mut row = link_row();
        row.kind = BookmarkType::File;
        assert!(matches!(
            row.validate(),
            Err(BookmarkValidationError::UnexpectedPayload { field: "link_url", .. })
        ));

        row.link_url = None;
        assert_eq!(row.validate(), Err(BookmarkValidationError::MissingFileId));

        row.file_id = Some("file-1".to_string());
        assert_eq!(row.validate(), Ok(()));
    }

    #[test]
    fn link_url_must_be_http() {
        let mut row = link_row();
        row.link_url = Some("ftp://example.com".to_string());
        assert_eq!(
            row.validate(),
            Err(BookmarkValidationError::InvalidUrl { field: "link_url" })
        );

        row.link_url = Some("HTTP://Example.com/a?b=c".to_string());
        assert_eq!(row.validate(), Ok(()));
    }

    #[test]
    fn display_name_limits() {
        let mut row = link_row();
        row.display_name = "   ".to_string();
        assert_eq!(row.validate(), Err(BookmarkValidationError::BlankDisplayName));

        row.display_name = "x".repeat(MAX_DISPLAY_NAME_CHARS + 1);
        assert!(matches!(
            row.validate(),
            Err(BookmarkValidationError::DisplayNameTooLong { .. })
        ));
    }

    #[test]
    fn update_before_create_is_rejected() {
        let mut row = link_row();
        row.update_at = row.create_at - 1;
        assert!(matches!(
            row.validate(),
            Err(BookmarkValidationError::InvalidTimestamps { .. })
        ));
    }

    #[test]
    fn type_tags_are_lowercase() {
        assert_eq!(BookmarkType::parse("file"), Some(BookmarkType::File));
        assert_eq!(BookmarkType::parse("File"), None);
        assert_eq!(BookmarkType::Link.as_str(), "link");
    }
}
