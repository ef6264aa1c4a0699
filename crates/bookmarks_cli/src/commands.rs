//! Subcommand execution against a bookmark service.

use crate::args::{Command, NewArgs};
use bookmarks_core::{
    BookmarkPatch, BookmarkRepository, BookmarkService, BookmarkServiceError, NewBookmark,
};
use serde_json::{json, Value};

/// Runs one subcommand and returns its JSON result.
pub fn execute<R: BookmarkRepository>(
    service: &BookmarkService<R>,
    command: Command,
) -> Result<Value, BookmarkServiceError> {
    let output = match command {
        Command::AddLink {
            common,
            url,
            image_url,
        } => {
            let link = NewBookmark::link(&common.channel, &common.name, url);
            let mut input = with_common(link, &common);
            input.image_url = image_url;
            json!(service.create_bookmark(input)?)
        }
        Command::AddFile { common, file_id } => {
            let file = NewBookmark::file(&common.channel, &common.name, file_id);
            let input = with_common(file, &common);
            json!(service.create_bookmark(input)?)
        }
        Command::Edit {
            bookmark_id,
            name,
            url,
            file_id,
            image_url,
            emoji,
        } => {
            let patch = BookmarkPatch {
                display_name: name,
                link_url: url,
                file_id,
                image_url,
                emoji,
            };
            json!(service.update_bookmark(bookmark_id, &patch)?)
        }
        Command::Delete { bookmark_id } => json!(service.delete_bookmark(bookmark_id)?),
        Command::Move {
            bookmark_id,
            channel,
            index,
        } => json!(service.reorder_bookmark(bookmark_id, &channel, index)?),
        Command::List { channel, since } => {
            json!(service.get_bookmarks_for_channel(&channel, since)?)
        }
        Command::Sync { channels, since } => {
            let ids: Vec<&str> = channels.iter().map(String::as_str).collect();
            json!(service.get_bookmarks_for_channels(&ids, since)?)
        }
    };
    Ok(output)
}

fn with_common(mut input: NewBookmark, common: &NewArgs) -> NewBookmark {
    input.owner_id = common.owner.clone();
    input.emoji = common.emoji.clone();
    input
}

#[cfg(test)]
mod tests {
    use super::execute;
    use crate::args::{Command, NewArgs};
    use bookmarks_core::{open_db_in_memory, BookmarkService, SqliteBookmarkRepository};

    fn service() -> BookmarkService<SqliteBookmarkRepository> {
        let conn = open_db_in_memory().unwrap();
        BookmarkService::new(SqliteBookmarkRepository::try_new(conn).unwrap())
    }

    fn add_link(name: &str) -> Command {
        Command::AddLink {
            common: NewArgs {
                channel: "town-square".to_string(),
                name: name.to_string(),
                owner: Some("u1".to_string()),
                emoji: None,
            },
            url: "https://example.com".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn add_then_list_prints_rows_in_order() {
        let service = service();
        let created = execute(&service, add_link("first")).unwrap();
        assert_eq!(created["sort_order"], 0);
        assert_eq!(created["type"], "link");
        execute(&service, add_link("second")).unwrap();

        let listed = execute(
            &service,
            Command::List {
                channel: "town-square".to_string(),
                since: 0,
            },
        )
        .unwrap();
        let names: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["display_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn sync_omits_channels_without_changes() {
        let service = service();
        execute(&service, add_link("first")).unwrap();
        let delta = execute(
            &service,
            Command::Sync {
                channels: vec!["town-square".to_string(), "empty".to_string()],
                since: 0,
            },
        )
        .unwrap();
        let object = delta.as_object().unwrap();
        assert!(object.contains_key("town-square"));
        assert!(!object.contains_key("empty"));
    }
}
