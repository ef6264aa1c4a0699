use bookmarks_core::{
    open_db_in_memory, BookmarkEvent, BookmarkNotifier, BookmarkService, ChannelBookmark,
    ManualClock, NewBookmark, SqliteBookmarkRepository,
};
use std::sync::{Arc, Mutex};

pub type Service = BookmarkService<SqliteBookmarkRepository>;

/// Notifier that keeps every event for later assertions.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<BookmarkEvent>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(BookmarkEvent::name).collect()
    }

    pub fn events(&self) -> Vec<BookmarkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl BookmarkNotifier for RecordingNotifier {
    fn notify(&self, event: &BookmarkEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[allow(dead_code)]
pub fn service() -> Service {
    let conn = open_db_in_memory().unwrap();
    BookmarkService::new(SqliteBookmarkRepository::try_new(conn).unwrap())
}

#[allow(dead_code)]
pub fn service_with_clock(start_ms: i64) -> (Service, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_ms));
    (service().with_clock(clock.clone()), clock)
}

#[allow(dead_code)]
pub fn add_link(service: &Service, channel_id: &str, name: &str) -> ChannelBookmark {
    service
        .create_bookmark(NewBookmark::link(channel_id, name, "https://example.com/docs"))
        .unwrap()
}

#[allow(dead_code)]
pub fn names(rows: &[ChannelBookmark]) -> Vec<&str> {
    rows.iter().map(|row| row.display_name.as_str()).collect()
}

#[allow(dead_code)]
pub fn assert_dense(rows: &[ChannelBookmark]) {
    let mut orders: Vec<i64> = rows.iter().map(|row| row.sort_order).collect();
    orders.sort_unstable();
    let expected: Vec<i64> = (0..rows.len() as i64).collect();
    assert_eq!(orders, expected, "sort orders are not dense");
}
