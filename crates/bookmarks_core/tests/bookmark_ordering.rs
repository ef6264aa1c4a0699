mod common;

use bookmarks_core::BookmarkServiceError;
use common::{add_link, assert_dense, names, service};
use uuid::Uuid;

#[test]
fn create_appends_to_end_of_channel() {
    let service = service();
    let first = add_link(&service, "c1", "first");
    let second = add_link(&service, "c1", "second");
    let other = add_link(&service, "c2", "other");

    assert_eq!(first.sort_order, 0);
    assert_eq!(second.sort_order, 1);
    assert_eq!(other.sort_order, 0);
}

#[test]
fn reorder_moves_bookmark_and_shifts_neighbours() {
    let service = service();
    let a = add_link(&service, "c1", "a");
    add_link(&service, "c1", "b");
    let c = add_link(&service, "c1", "c");
    add_link(&service, "c1", "d");

    let rows = service.reorder_bookmark(c.id, "c1", 0).unwrap();
    assert_eq!(names(&rows), vec!["c", "a", "b", "d"]);
    assert_dense(&rows);

    let rows = service.reorder_bookmark(a.id, "c1", 3).unwrap();
    assert_eq!(names(&rows), vec!["c", "b", "d", "a"]);
    assert_dense(&rows);

    let listed = service.get_bookmarks_for_channel("c1", 0).unwrap();
    assert_eq!(names(&listed), vec!["c", "b", "d", "a"]);
}

#[test]
fn reorder_to_current_index_changes_nothing() {
    let service = service();
    add_link(&service, "c1", "a");
    let b = add_link(&service, "c1", "b");

    let before = service.get_bookmarks_for_channel("c1", 0).unwrap();
    let rows = service.reorder_bookmark(b.id, "c1", 1).unwrap();
    assert_eq!(rows, before);
}

#[test]
fn reorder_rejects_out_of_range_and_foreign_ids() {
    let service = service();
    let a = add_link(&service, "c1", "a");
    add_link(&service, "c1", "b");
    let elsewhere = add_link(&service, "c2", "x");

    assert!(matches!(
        service.reorder_bookmark(a.id, "c1", 2),
        Err(BookmarkServiceError::OutOfRange {
            new_index: 2,
            active_count: 2
        })
    ));
    assert!(matches!(
        service.reorder_bookmark(a.id, "c1", -1),
        Err(BookmarkServiceError::OutOfRange { .. })
    ));
    assert!(matches!(
        service.reorder_bookmark(elsewhere.id, "c1", 0),
        Err(BookmarkServiceError::NotFound(id)) if id == elsewhere.id
    ));
    assert!(matches!(
        service.reorder_bookmark(Uuid::new_v4(), "c1", 0),
        Err(BookmarkServiceError::NotFound(_))
    ));
}

#[test]
fn delete_compacts_remaining_positions() {
    let service = service();
    add_link(&service, "c1", "a");
    let b = add_link(&service, "c1", "b");
    add_link(&service, "c1", "c");

    let deleted = service.delete_bookmark(b.id).unwrap();
    assert!(deleted.is_deleted());

    let rows = service.get_bookmarks_for_channel("c1", 0).unwrap();
    assert_eq!(names(&rows), vec!["a", "c"]);
    assert_dense(&rows);

    let appended = add_link(&service, "c1", "d");
    assert_eq!(appended.sort_order, 2);
}

#[test]
fn density_survives_mixed_mutation_sequence() {
    let service = service();
    let mut ids = Vec::new();
    for index in 0..6 {
        ids.push(add_link(&service, "c1", &format!("b{index}")).id);
    }

    service.reorder_bookmark(ids[5], "c1", 0).unwrap();
    service.delete_bookmark(ids[2]).unwrap();
    let forked = service
        .update_bookmark(ids[0], &bookmarks_core::BookmarkPatch::default().display_name("renamed"))
        .unwrap();
    service.reorder_bookmark(forked.updated.id, "c1", 4).unwrap();
    service.delete_bookmark(ids[5]).unwrap();
    add_link(&service, "c1", "tail");

    let rows = service.get_bookmarks_for_channel("c1", 0).unwrap();
    assert_eq!(rows.len(), 5);
    assert_dense(&rows);
    assert_eq!(rows.last().map(|row| row.display_name.as_str()), Some("tail"));
}

#[test]
fn moving_first_to_last_and_back_restores_order() {
    let service = service();
    let ids: Vec<_> = (0..5)
        .map(|index| add_link(&service, "c1", &format!("b{index}")).id)
        .collect();

    let rows = service.reorder_bookmark(ids[0], "c1", 4).unwrap();
    assert_eq!(names(&rows), vec!["b1", "b2", "b3", "b4", "b0"]);
    assert_eq!(
        rows.iter().map(|row| row.sort_order).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );
    assert!(matches!(
        service.reorder_bookmark(ids[0], "c1", 5),
        Err(BookmarkServiceError::OutOfRange { .. })
    ));

    let rows = service.reorder_bookmark(ids[0], "c1", 0).unwrap();
    assert_eq!(names(&rows), vec!["b0", "b1", "b2", "b3", "b4"]);
}
