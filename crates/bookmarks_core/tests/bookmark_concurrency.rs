mod common;

use bookmarks_core::{
    open_db, BookmarkEvent, BookmarkNotifier, BookmarkRepository, BookmarkService,
    BookmarkServiceError, NewBookmark, ServiceOptions, SqliteBookmarkRepository,
};
use common::{add_link, assert_dense, service};
use rusqlite::TransactionBehavior;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Holds the first `slow` channel create inside its writer section until
/// released.
struct GateNotifier {
    armed: AtomicBool,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl BookmarkNotifier for GateNotifier {
    fn notify(&self, event: &BookmarkEvent) {
        if event.channel_id() != "slow" || !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }
        self.entered.lock().unwrap().send(()).unwrap();
        let _ = self
            .release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10));
    }
}

#[test]
fn busy_channel_times_out_while_other_channel_proceeds() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let notifier = Arc::new(GateNotifier {
        armed: AtomicBool::new(true),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let service = Arc::new(
        service()
            .with_notifier(notifier)
            .with_options(ServiceOptions {
                lock_timeout: Duration::from_millis(50),
                ..ServiceOptions::default()
            }),
    );

    let holder = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            service
                .create_bookmark(NewBookmark::link("slow", "held", "https://example.com"))
                .unwrap()
        })
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let err = service
        .create_bookmark(NewBookmark::link("slow", "blocked", "https://example.com"))
        .unwrap_err();
    assert!(matches!(
        &err,
        BookmarkServiceError::Timeout { channel_id, .. } if channel_id == "slow"
    ));
    assert!(err.is_retryable());

    let other = add_link(&service, "fast", "unaffected");
    assert_eq!(other.sort_order, 0);

    // Reads do not enter channel sections.
    assert_eq!(service.get_bookmarks_for_channel("slow", 0).unwrap().len(), 1);

    release_tx.send(()).unwrap();
    holder.join().unwrap();
    let retried = add_link(&service, "slow", "retried");
    assert_eq!(retried.sort_order, 1);
}

#[test]
fn concurrent_writers_keep_channel_dense() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("bookmarks.db")).unwrap();
    let service = Arc::new(
        BookmarkService::new(SqliteBookmarkRepository::try_new(conn).unwrap()).with_options(
            ServiceOptions {
                lock_timeout: Duration::from_secs(10),
                ..ServiceOptions::default()
            },
        ),
    );

    let seeded: Vec<_> = (0..8)
        .map(|index| add_link(&service, "shared", &format!("seed-{index}")).id)
        .collect();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let service = Arc::clone(&service);
            let target = seeded[worker];
            let victim = seeded[4 + worker];
            thread::spawn(move || {
                for round in 0..5_i64 {
                    add_link(&service, "shared", &format!("w{worker}-{round}"));
                    let _ = service.reorder_bookmark(target, "shared", round % 3);
                }
                service.delete_bookmark(victim).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let rows = service.get_bookmarks_for_channel("shared", 0).unwrap();
    assert_eq!(rows.len(), 8 + 4 * 5 - 4);
    assert_dense(&rows);
}

#[test]
fn separate_reader_repository_is_not_blocked_by_open_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookmarks.db");
    let writer_repo = SqliteBookmarkRepository::try_new(open_db(&path).unwrap()).unwrap();
    let writer = BookmarkService::new(writer_repo);
    add_link(&writer, "c1", "committed");
    let reader = SqliteBookmarkRepository::try_new(open_db(&path).unwrap()).unwrap();

    let mut blocker = open_db(&path).unwrap();
    let tx = blocker
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    tx.execute(
        "UPDATE channel_bookmarks SET display_name = 'pending' WHERE channel_id = 'c1';",
        [],
    )
    .unwrap();

    let rows = reader.list_active("c1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].display_name, "committed");

    tx.rollback().unwrap();
}
