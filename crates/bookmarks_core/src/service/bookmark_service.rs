//! Channel bookmark use-case service.
//!
//! # Responsibility
//! - Validate requests and resolve bookmark ownership before delegating.
//! - Run every mutation inside its channel's exclusive section.
//! - Compose versioning, ordering and sync engines over the repository.
//!
//! # Invariants
//! - Writers of one channel are serialized; different channels never wait
//!   on each other. Reads never enter a channel section.
//! - The operation instant is sampled inside the section, shared by all
//!   rows the operation writes, and later than every stored change of the
//!   channel.
//! - Exactly one event is published per committed mutation, after commit.

use crate::clock::{Clock, SystemClock};
use crate::engine::ordering::{self, OrderingError};
use crate::engine::sync::{self, ChannelBookmarkMap};
use crate::engine::versioning::{self, VersioningError};
use crate::model::bookmark::{
    BookmarkId, BookmarkPatch, BookmarkValidationError, ChannelBookmark, NewBookmark,
    UpdateBookmarkResult,
};
use crate::model::change_set::BookmarkChangeSet;
use crate::repo::bookmark_repo::{BookmarkRepository, RepoError};
use crate::service::channel_locks::{ChannelLocks, LockTimeout};
use crate::service::notify::{BookmarkEvent, BookmarkNotifier, NoopNotifier};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_BOOKMARKS_PER_CHANNEL: usize = 50;

/// Tunables for the bookmark service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Longest wait for a channel's writer section.
    pub lock_timeout: Duration,
    /// Active bookmarks allowed per channel.
    pub max_bookmarks_per_channel: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_bookmarks_per_channel: DEFAULT_MAX_BOOKMARKS_PER_CHANNEL,
        }
    }
}

/// Errors from bookmark service operations.
#[derive(Debug)]
pub enum BookmarkServiceError {
    /// Input or merged row violates a bookmark rule.
    InvalidArgument(BookmarkValidationError),
    /// Bookmark is absent or not part of the stated channel.
    NotFound(BookmarkId),
    /// Mutation targeted a tombstone.
    AlreadyDeleted(BookmarkId),
    /// Reorder index outside `0..active_count`.
    OutOfRange { new_index: i64, active_count: usize },
    /// Channel writer section stayed busy past the configured wait.
    Timeout { channel_id: String, waited_ms: u64 },
    /// Repository-level failure.
    Repo(RepoError),
}

impl BookmarkServiceError {
    /// Stable snake_case code for logs and callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::AlreadyDeleted(_) => "already_deleted",
            Self::OutOfRange { .. } => "out_of_range",
            Self::Timeout { .. } => "timeout",
            Self::Repo(RepoError::StaleWrite { .. }) => "conflict",
            Self::Repo(_) => "storage_error",
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Repo(RepoError::StaleWrite { .. })
        )
    }
}

impl Display for BookmarkServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "invalid argument: {err}"),
            Self::NotFound(id) => write!(f, "bookmark not found: {id}"),
            Self::AlreadyDeleted(id) => write!(f, "bookmark already deleted: {id}"),
            Self::OutOfRange {
                new_index,
                active_count,
            } => write!(
                f,
                "sort index {new_index} is out of range for {active_count} bookmarks"
            ),
            Self::Timeout {
                channel_id,
                waited_ms,
            } => write!(
                f,
                "channel {channel_id} is busy; gave up after {waited_ms} ms"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BookmarkServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BookmarkServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::InvalidArgument(err),
            other => Self::Repo(other),
        }
    }
}

impl From<BookmarkValidationError> for BookmarkServiceError {
    fn from(value: BookmarkValidationError) -> Self {
        Self::InvalidArgument(value)
    }
}

impl From<VersioningError> for BookmarkServiceError {
    fn from(value: VersioningError) -> Self {
        match value {
            VersioningError::Invalid(err) => Self::InvalidArgument(err),
            VersioningError::AlreadyDeleted(id) => Self::AlreadyDeleted(id),
        }
    }
}

impl From<OrderingError> for BookmarkServiceError {
    fn from(value: OrderingError) -> Self {
        match value {
            OrderingError::NotFound(id) => Self::NotFound(id),
            OrderingError::OutOfRange {
                new_index,
                active_count,
            } => Self::OutOfRange {
                new_index,
                active_count,
            },
        }
    }
}

impl From<LockTimeout> for BookmarkServiceError {
    fn from(value: LockTimeout) -> Self {
        Self::Timeout {
            channel_id: value.channel_id,
            waited_ms: u64::try_from(value.waited.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub type ServiceResult<T> = Result<T, BookmarkServiceError>;

/// Public facade over bookmark storage and engines.
pub struct BookmarkService<R: BookmarkRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn BookmarkNotifier>,
    locks: ChannelLocks,
    options: ServiceOptions,
}

impl<R: BookmarkRepository> BookmarkService<R> {
    /// Creates service with default options, system clock and no notifier.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock::new()),
            notifier: Arc::new(NoopNotifier),
            locks: ChannelLocks::new(),
            options: ServiceOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn BookmarkNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates one bookmark at the end of its channel.
    ///
    /// # Errors
    /// - `InvalidArgument` for type/payload mismatch, field limits, or a full
    ///   channel.
    /// - `Timeout` when the channel section is busy.
    pub fn create_bookmark(&self, input: NewBookmark) -> ServiceResult<ChannelBookmark> {
        let channel_id = input.channel_id.trim().to_string();
        if channel_id.is_empty() {
            return Err(BookmarkValidationError::BlankChannelId.into());
        }

        self.write_section("create", &channel_id, || {
            let active = self.repo.list_active(&channel_id)?;
            let limit = self.options.max_bookmarks_per_channel;
            if active.len() >= limit {
                return Err(BookmarkValidationError::ChannelLimitReached {
                    channel_id: channel_id.clone(),
                    limit,
                }
                .into());
            }

            let at = self.operation_instant(&channel_id)?;
            let plan = versioning::plan_create(input, active.len(), at)?;
            self.repo.apply_changes(&plan.changes)?;
            debug!(
                "event=bookmark_create module=service status=committed channel_id={} bookmark_id={} sort_order={}",
                channel_id, plan.bookmark.id, plan.bookmark.sort_order
            );
            self.notifier.notify(&BookmarkEvent::Created {
                bookmark: plan.bookmark.clone(),
            });
            Ok(plan.bookmark)
        })
    }

    /// Forks the bookmark with `patch` applied and tombstones the predecessor.
    ///
    /// Forking is unconditional: every successful update yields a new row id.
    ///
    /// # Errors
    /// - `NotFound`, `AlreadyDeleted`, `InvalidArgument`, `Timeout`.
    pub fn update_bookmark(
        &self,
        bookmark_id: BookmarkId,
        patch: &BookmarkPatch,
    ) -> ServiceResult<UpdateBookmarkResult> {
        let channel_id = self.resolve_active_channel(bookmark_id)?;

        self.write_section("update", &channel_id, || {
            let current = self.load_any(bookmark_id)?;
            let at = self.operation_instant(&channel_id)?;
            let plan = versioning::plan_update(&current, patch, at)?;
            self.repo.apply_changes(&plan.changes)?;
            debug!(
                "event=bookmark_update module=service status=committed channel_id={} bookmark_id={} original_id={}",
                channel_id, plan.result.updated.id, plan.result.deleted.id
            );
            self.notifier.notify(&BookmarkEvent::updated(&plan.result));
            Ok(plan.result)
        })
    }

    /// Tombstones the bookmark and closes the position gap it leaves.
    ///
    /// # Errors
    /// - `NotFound`, `AlreadyDeleted`, `Timeout`.
    pub fn delete_bookmark(&self, bookmark_id: BookmarkId) -> ServiceResult<ChannelBookmark> {
        let channel_id = self.resolve_active_channel(bookmark_id)?;

        self.write_section("delete", &channel_id, || {
            let current = self.load_any(bookmark_id)?;
            let active = self.repo.list_active(&channel_id)?;
            let at = self.operation_instant(&channel_id)?;
            let plan = versioning::plan_delete(&current, &active, at)?;
            self.repo.apply_changes(&plan.changes)?;
            debug!(
                "event=bookmark_delete module=service status=committed channel_id={} bookmark_id={} compacted={}",
                channel_id,
                bookmark_id,
                plan.changes.moves.len()
            );
            self.notifier.notify(&BookmarkEvent::Deleted {
                bookmark: plan.deleted.clone(),
            });
            Ok(plan.deleted)
        })
    }

    /// Moves one bookmark to `new_index` and returns the channel's active
    /// list in display order.
    ///
    /// Moving to the current index commits nothing and publishes no event.
    ///
    /// # Errors
    /// - `NotFound` when the bookmark is not active in `channel_id`.
    /// - `OutOfRange` when `new_index` is outside `0..active_count`.
    /// - `Timeout` when the channel section is busy.
    pub fn reorder_bookmark(
        &self,
        bookmark_id: BookmarkId,
        channel_id: &str,
        new_index: i64,
    ) -> ServiceResult<Vec<ChannelBookmark>> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(BookmarkValidationError::BlankChannelId.into());
        }

        self.write_section("reorder", channel_id, || {
            let active = self.repo.list_active(channel_id)?;
            let moves = ordering::plan_reorder(&active, bookmark_id, new_index)?;
            if moves.is_empty() {
                return Ok(active);
            }

            let at = self.operation_instant(channel_id)?;
            let mut changes = BookmarkChangeSet::new(channel_id, at);
            changes.moves = moves;
            self.repo.apply_changes(&changes)?;

            let mut reordered = self.repo.list_active(channel_id)?;
            ordering::sort_for_display(&mut reordered);
            debug!(
                "event=bookmark_reorder module=service status=committed channel_id={} bookmark_id={} new_index={} shifted={}",
                channel_id,
                bookmark_id,
                new_index,
                changes.moves.len()
            );
            self.notifier.notify(&BookmarkEvent::Sorted {
                channel_id: channel_id.to_string(),
                bookmarks: reordered.clone(),
            });
            Ok(reordered)
        })
    }

    /// Returns the channel's active rows when `since == 0`, otherwise every
    /// row with a change timestamp after `since`.
    pub fn get_bookmarks_for_channel(
        &self,
        channel_id: &str,
        since: i64,
    ) -> ServiceResult<Vec<ChannelBookmark>> {
        let mut rows = sync::channel_delta(&self.repo, channel_id.trim(), since)?;
        if since <= 0 {
            ordering::sort_for_display(&mut rows);
        }
        Ok(rows)
    }

    /// Multi-channel variant of `get_bookmarks_for_channel`; channels with
    /// nothing to report are omitted.
    pub fn get_bookmarks_for_channels(
        &self,
        channel_ids: &[&str],
        since: i64,
    ) -> ServiceResult<ChannelBookmarkMap> {
        let trimmed: Vec<&str> = channel_ids
            .iter()
            .map(|channel_id| channel_id.trim())
            .filter(|channel_id| !channel_id.is_empty())
            .collect();
        let started_at = Instant::now();
        let delta = sync::delta(&self.repo, &trimmed, since)?;
        debug!(
            "event=bookmark_delta module=service status=ok requested_channels={} returned_channels={} since={} duration_ms={}",
            trimmed.len(),
            delta.len(),
            since,
            started_at.elapsed().as_millis()
        );
        Ok(delta)
    }

    /// Instant shared by every row of one mutation. Never earlier than the
    /// channel's newest stored change, so rows stay ordered and delta
    /// watermarks keep advancing when the wall clock steps back.
    fn operation_instant(&self, channel_id: &str) -> ServiceResult<i64> {
        let now = self.clock.now_ms();
        let floor = self.repo.latest_change_at(channel_id)? + 1;
        if now < floor {
            warn!(
                "event=clock_behind module=service status=adjusted channel_id={} now_ms={} floor_ms={}",
                channel_id, now, floor
            );
            return Ok(floor);
        }
        Ok(now)
    }

    fn load_any(&self, bookmark_id: BookmarkId) -> ServiceResult<ChannelBookmark> {
        self.repo
            .get_bookmark(bookmark_id, true)?
            .ok_or(BookmarkServiceError::NotFound(bookmark_id))
    }

    /// Resolves the owning channel outside any section. Channel ids never
    /// change, so the section entered afterwards is the right one.
    fn resolve_active_channel(&self, bookmark_id: BookmarkId) -> ServiceResult<String> {
        let row = self.load_any(bookmark_id)?;
        if row.is_deleted() {
            return Err(BookmarkServiceError::AlreadyDeleted(bookmark_id));
        }
        Ok(row.channel_id)
    }

    fn write_section<T>(
        &self,
        operation: &'static str,
        channel_id: &str,
        work: impl FnOnce() -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let started_at = Instant::now();
        let outcome = self
            .locks
            .with_channel(channel_id, self.options.lock_timeout, work)
            .map_err(BookmarkServiceError::from)
            .and_then(|result| result);

        let duration_ms = started_at.elapsed().as_millis();
        match &outcome {
            Ok(_) => info!(
                "event=bookmark_{operation} module=service status=ok channel_id={channel_id} duration_ms={duration_ms}"
            ),
            Err(err @ BookmarkServiceError::Repo(_)) => error!(
                "event=bookmark_{operation} module=service status=error channel_id={channel_id} duration_ms={duration_ms} error_code={} error={err}",
                err.code()
            ),
            Err(err) => warn!(
                "event=bookmark_{operation} module=service status=error channel_id={channel_id} duration_ms={duration_ms} error_code={}",
                err.code()
            ),
        }
        outcome
    }
}
