//! Channel bookmark repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Load bookmark rows by id, by channel, and by change watermark.
//! - Commit engine change sets as single `IMMEDIATE` transactions.
//!
//! # Invariants
//! - Active listings are ordered `sort_order ASC, create_at ASC, id ASC`.
//! - Every tombstone and move checks the row's expected prior state; a
//!   mismatch rolls back the whole change set with `StaleWrite`.
//! - Moves are written in two phases (parked on negative slots, then final)
//!   so the unique active-position index holds after every statement.
//!
//! # Limitations
//! - One connection behind one mutex serves every channel, so a read waits
//!   for any in-flight commit even on an unrelated channel. Commits are short
//!   single transactions; hosts needing parallel readers open one repository
//!   per reader thread on the same WAL database file.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::bookmark::{BookmarkId, BookmarkType, BookmarkValidationError, ChannelBookmark};
use crate::model::change_set::BookmarkChangeSet;
use crate::model::watermark::Watermark;
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const BOOKMARK_SELECT_SQL: &str = "SELECT
    id,
    channel_id,
    owner_id,
    file_id,
    display_name,
    sort_order,
    link_url,
    image_url,
    emoji,
    type,
    create_at,
    update_at,
    delete_at,
    original_id
FROM channel_bookmarks";

const REQUIRED_COLUMNS: [&str; 14] = [
    "id",
    "channel_id",
    "owner_id",
    "file_id",
    "display_name",
    "sort_order",
    "link_url",
    "image_url",
    "emoji",
    "type",
    "create_at",
    "update_at",
    "delete_at",
    "original_id",
];

/// Upper bound of channel ids bound into one `IN (...)` list.
const MAX_CHANNELS_PER_QUERY: usize = 256;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from bookmark persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Row failed validation before write or after read.
    Validation(BookmarkValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    NotFound(BookmarkId),
    /// Row no longer matches the state the change set was planned against.
    StaleWrite {
        channel_id: String,
        bookmark_id: BookmarkId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data or change set cannot be mapped to a valid row.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "bookmark not found: {id}"),
            Self::StaleWrite {
                channel_id,
                bookmark_id,
            } => write!(
                f,
                "bookmark {bookmark_id} in channel {channel_id} changed before commit"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "bookmark repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "bookmark repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "bookmark repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid bookmark data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BookmarkValidationError> for RepoError {
    fn from(value: BookmarkValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract for channel bookmarks.
///
/// Implementations must be shareable across request threads; each call
/// observes one consistent snapshot.
pub trait BookmarkRepository: Send + Sync {
    /// Loads one row by id. Tombstones are returned only with `include_deleted`.
    fn get_bookmark(
        &self,
        id: BookmarkId,
        include_deleted: bool,
    ) -> RepoResult<Option<ChannelBookmark>>;
    /// Lists active rows of one channel in display order.
    fn list_active(&self, channel_id: &str) -> RepoResult<Vec<ChannelBookmark>>;
    /// Newest `create_at`/`update_at`/`delete_at` over every row of the
    /// channel, tombstones included; `0` for an empty channel.
    fn latest_change_at(&self, channel_id: &str) -> RepoResult<i64>;
    /// Lists rows of the given channels selected by `watermark`.
    fn list_changed(
        &self,
        channel_ids: &[&str],
        watermark: Watermark,
    ) -> RepoResult<Vec<ChannelBookmark>>;
    /// Commits one change set atomically.
    fn apply_changes(&self, changes: &BookmarkChangeSet) -> RepoResult<()>;
}

/// SQLite-backed bookmark repository owning one migrated connection.
pub struct SqliteBookmarkRepository {
    conn: Mutex<Connection>,
}

impl SqliteBookmarkRepository {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_bookmark_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl BookmarkRepository for SqliteBookmarkRepository {
    fn get_bookmark(
        &self,
        id: BookmarkId,
        include_deleted: bool,
    ) -> RepoResult<Option<ChannelBookmark>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "{BOOKMARK_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR delete_at = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), i64::from(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_bookmark_row(row)?));
        }
        Ok(None)
    }

    fn list_active(&self, channel_id: &str) -> RepoResult<Vec<ChannelBookmark>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "{BOOKMARK_SELECT_SQL}
             WHERE channel_id = ?1
               AND delete_at = 0
             ORDER BY sort_order ASC, create_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([channel_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_bookmark_row(row)?);
        }
        Ok(items)
    }

    fn latest_change_at(&self, channel_id: &str) -> RepoResult<i64> {
        let conn = self.conn.lock();
        let latest: i64 = conn.query_row(
            "SELECT COALESCE(MAX(MAX(create_at, update_at, delete_at)), 0)
             FROM channel_bookmarks
             WHERE channel_id = ?1;",
            [channel_id],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    fn list_changed(
        &self,
        channel_ids: &[&str],
        watermark: Watermark,
    ) -> RepoResult<Vec<ChannelBookmark>> {
        let unique: Vec<&str> = channel_ids
            .iter()
            .copied()
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.lock();
        // One read transaction keeps every chunk on the same snapshot.
        let tx = conn.transaction()?;
        let mut items = Vec::new();
        for chunk in unique.chunks(MAX_CHANNELS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut bind_values: Vec<Value> = chunk
                .iter()
                .map(|channel_id| Value::Text((*channel_id).to_string()))
                .collect();

            let sql = match watermark {
                Watermark::FullSnapshot => format!(
                    "{BOOKMARK_SELECT_SQL}
                     WHERE channel_id IN ({placeholders})
                       AND delete_at = 0
                     ORDER BY channel_id ASC, sort_order ASC, create_at ASC, id ASC;"
                ),
                Watermark::Since(since) => {
                    bind_values.extend([
                        Value::Integer(since),
                        Value::Integer(since),
                        Value::Integer(since),
                    ]);
                    format!(
                        "{BOOKMARK_SELECT_SQL}
                         WHERE channel_id IN ({placeholders})
                           AND (create_at > ? OR update_at > ? OR delete_at > ?)
                         ORDER BY channel_id ASC, sort_order ASC, update_at ASC, id ASC;"
                    )
                }
            };

            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            while let Some(row) = rows.next()? {
                items.push(parse_bookmark_row(row)?);
            }
        }
        tx.commit()?;
        Ok(items)
    }

    fn apply_changes(&self, changes: &BookmarkChangeSet) -> RepoResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        for insert in &changes.inserts {
            insert.validate()?;
            if insert.channel_id != changes.channel_id {
                return Err(RepoError::InvalidData(format!(
                    "insert {} targets channel {} inside change set for {}",
                    insert.id, insert.channel_id, changes.channel_id
                )));
            }
        }

        let mut conn = self.conn.lock();
        // Dropping `tx` on any early return rolls the whole set back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for tombstone in &changes.tombstones {
            let changed = tx.execute(
                "UPDATE channel_bookmarks
                 SET delete_at = ?1,
                     update_at = ?1
                 WHERE id = ?2
                   AND channel_id = ?3
                   AND delete_at = 0
                   AND sort_order = ?4;",
                params![
                    changes.at,
                    tombstone.bookmark_id.to_string(),
                    changes.channel_id.as_str(),
                    tombstone.sort_order,
                ],
            )?;
            if changed != 1 {
                return Err(stale(changes, tombstone.bookmark_id));
            }
        }

        for change in &changes.moves {
            let changed = tx.execute(
                "UPDATE channel_bookmarks
                 SET sort_order = ?1
                 WHERE id = ?2
                   AND channel_id = ?3
                   AND delete_at = 0
                   AND sort_order = ?4;",
                params![
                    parked_slot(change.to),
                    change.bookmark_id.to_string(),
                    changes.channel_id.as_str(),
                    change.from,
                ],
            )?;
            if changed != 1 {
                return Err(stale(changes, change.bookmark_id));
            }
        }

        for insert in &changes.inserts {
            tx.execute(
                "INSERT INTO channel_bookmarks (
                    id,
                    channel_id,
                    owner_id,
                    file_id,
                    display_name,
                    sort_order,
                    link_url,
                    image_url,
                    emoji,
                    type,
                    create_at,
                    update_at,
                    delete_at,
                    original_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                params![
                    insert.id.to_string(),
                    insert.channel_id.as_str(),
                    insert.owner_id.as_deref(),
                    insert.file_id.as_deref(),
                    insert.display_name.as_str(),
                    insert.sort_order,
                    insert.link_url.as_deref(),
                    insert.image_url.as_deref(),
                    insert.emoji.as_deref(),
                    insert.kind.as_str(),
                    insert.create_at,
                    insert.update_at,
                    insert.delete_at,
                    insert.original_id.map(|value| value.to_string()),
                ],
            )?;
        }

        for change in &changes.moves {
            let changed = tx.execute(
                "UPDATE channel_bookmarks
                 SET sort_order = ?1,
                     update_at = ?2
                 WHERE id = ?3
                   AND sort_order = ?4;",
                params![
                    change.to,
                    changes.at,
                    change.bookmark_id.to_string(),
                    parked_slot(change.to),
                ],
            )?;
            if changed != 1 {
                return Err(stale(changes, change.bookmark_id));
            }
        }

        tx.commit()?;
        debug!(
            "event=bookmark_commit module=repo status=ok channel_id={} rows={}",
            changes.channel_id,
            changes.row_count()
        );
        Ok(())
    }
}

/// Temporary position outside the valid range, unique per target slot.
fn parked_slot(to: i64) -> i64 {
    -(to + 1)
}

fn stale(changes: &BookmarkChangeSet, bookmark_id: BookmarkId) -> RepoError {
    warn!(
        "event=bookmark_commit module=repo status=error error_code=stale_write channel_id={} bookmark_id={}",
        changes.channel_id, bookmark_id
    );
    RepoError::StaleWrite {
        channel_id: changes.channel_id.clone(),
        bookmark_id,
    }
}

fn parse_bookmark_row(row: &Row<'_>) -> RepoResult<ChannelBookmark> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "channel_bookmarks.id")?;

    let original_id = row
        .get::<_, Option<String>>("original_id")?
        .map(|value| parse_uuid(&value, "channel_bookmarks.original_id"))
        .transpose()?;

    let type_text: String = row.get("type")?;
    let kind = BookmarkType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid bookmark type `{type_text}` in channel_bookmarks.type"
        ))
    })?;

    let bookmark = ChannelBookmark {
        id,
        channel_id: row.get("channel_id")?,
        owner_id: row.get("owner_id")?,
        display_name: row.get("display_name")?,
        kind,
        link_url: row.get("link_url")?,
        file_id: row.get("file_id")?,
        image_url: row.get("image_url")?,
        emoji: row.get("emoji")?,
        sort_order: row.get("sort_order")?,
        create_at: row.get("create_at")?,
        update_at: row.get("update_at")?,
        delete_at: row.get("delete_at")?,
        original_id,
    };
    bookmark.validate()?;
    Ok(bookmark)
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_bookmark_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "channel_bookmarks")? {
        return Err(RepoError::MissingRequiredTable("channel_bookmarks"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "channel_bookmarks", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "channel_bookmarks",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
