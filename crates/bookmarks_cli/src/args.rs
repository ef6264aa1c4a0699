//! CLI argument definitions.

use bookmarks_core::BookmarkId;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Manage ordered channel bookmarks in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "bookmarks")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides `database_path` from the config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Append a link bookmark to a channel
    AddLink {
        #[command(flatten)]
        common: NewArgs,
        #[arg(long)]
        url: String,
        /// Preview image URL
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Append a file bookmark to a channel
    AddFile {
        #[command(flatten)]
        common: NewArgs,
        #[arg(long)]
        file_id: String,
    },

    /// Fork a bookmark with new field values
    Edit {
        bookmark_id: BookmarkId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        file_id: Option<String>,
        /// Empty string clears the preview image
        #[arg(long)]
        image_url: Option<String>,
        /// Empty string clears the emoji
        #[arg(long)]
        emoji: Option<String>,
    },

    /// Tombstone a bookmark
    Delete { bookmark_id: BookmarkId },

    /// Move a bookmark to a zero-based position
    Move {
        bookmark_id: BookmarkId,
        #[arg(long)]
        channel: String,
        #[arg(long, allow_negative_numbers = true)]
        index: i64,
    },

    /// List one channel's bookmarks
    List {
        #[arg(long)]
        channel: String,
        /// Return rows changed after this epoch-ms instant; 0 for the active list
        #[arg(long, default_value_t = 0)]
        since: i64,
    },

    /// Fetch bookmark changes for several channels
    Sync {
        #[arg(long = "channel", required = true, num_args = 1..)]
        channels: Vec<String>,
        #[arg(long, default_value_t = 0)]
        since: i64,
    },
}

#[derive(Args, Debug)]
pub struct NewArgs {
    #[arg(long)]
    pub channel: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
}
