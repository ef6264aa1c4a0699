//! Channel bookmarks core.
//! Ordering, versioning and delta sync over SQLite-backed channel bookmarks.

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BookmarkConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::sync::ChannelBookmarkMap;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::bookmark::{
    BookmarkId, BookmarkPatch, BookmarkType, BookmarkValidationError, ChannelBookmark,
    NewBookmark, UpdateBookmarkResult,
};
pub use model::change_set::{BookmarkChangeSet, SortMove, Tombstone};
pub use model::watermark::Watermark;
pub use repo::bookmark_repo::{
    BookmarkRepository, RepoError, RepoResult, SqliteBookmarkRepository,
};
pub use service::bookmark_service::{
    BookmarkService, BookmarkServiceError, ServiceOptions, ServiceResult,
};
pub use service::notify::{BookmarkEvent, BookmarkNotifier, NoopNotifier};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
