use bookmarks_core::db::open_db_in_memory;
use rusqlite::{params, Connection};

fn insert_link(
    conn: &Connection,
    id: &str,
    sort_order: i64,
    delete_at: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO channel_bookmarks (
            id, channel_id, display_name, sort_order, link_url, type,
            create_at, update_at, delete_at
        ) VALUES (?1, 'c1', 'Docs', ?2, 'https://example.com', 'link', 10, 10, ?3);",
        params![id, sort_order, delete_at],
    )
}

#[test]
fn tombstoned_rows_reject_updates() {
    let conn = open_db_in_memory().unwrap();
    insert_link(&conn, "a", 0, 20).unwrap();

    let result = conn.execute(
        "UPDATE channel_bookmarks SET display_name = 'Changed' WHERE id = 'a';",
        [],
    );
    assert!(result.is_err());

    let name: String = conn
        .query_row(
            "SELECT display_name FROM channel_bookmarks WHERE id = 'a';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "Docs");
}

#[test]
fn channel_and_type_cannot_change_on_active_rows() {
    let conn = open_db_in_memory().unwrap();
    insert_link(&conn, "a", 0, 0).unwrap();

    assert!(conn
        .execute("UPDATE channel_bookmarks SET channel_id = 'c2' WHERE id = 'a';", [])
        .is_err());
    assert!(conn
        .execute(
            "UPDATE channel_bookmarks SET type = 'file', file_id = 'f', link_url = NULL WHERE id = 'a';",
            [],
        )
        .is_err());
}

#[test]
fn active_positions_are_unique_per_channel() {
    let conn = open_db_in_memory().unwrap();
    insert_link(&conn, "a", 0, 0).unwrap();
    assert!(insert_link(&conn, "b", 0, 0).is_err());

    // Tombstones may share a slot with an active row.
    insert_link(&conn, "c", 0, 30).unwrap();
}

#[test]
fn payload_must_match_type() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO channel_bookmarks (
            id, channel_id, display_name, sort_order, file_id, type, create_at, update_at
        ) VALUES ('x', 'c1', 'Broken', 0, 'file-1', 'link', 1, 1);",
        [],
    );
    assert!(result.is_err());
}
