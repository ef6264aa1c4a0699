//! `bookmarks` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, open storage and dispatch one subcommand.
//! - Print results as JSON on stdout and failures on stderr.

mod args;
mod commands;

use args::Cli;
use bookmarks_core::{
    init_logging, open_db, BookmarkConfig, BookmarkService, SqliteBookmarkRepository,
};
use clap::Parser;
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, String> {
    let mut config = match &cli.config {
        Some(path) => BookmarkConfig::load(path).map_err(|err| err.to_string())?,
        None => BookmarkConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    let conn = open_db(&config.database_path).map_err(|err| err.to_string())?;
    let repo = SqliteBookmarkRepository::try_new(conn).map_err(|err| err.to_string())?;
    let service = BookmarkService::new(repo).with_options(config.service_options());

    let value = commands::execute(&service, cli.command).map_err(|err| {
        error!(
            "event=cli_command module=cli status=error error_code={} retryable={}",
            err.code(),
            err.is_retryable()
        );
        format!("{} ({})", err, err.code())
    })?;
    serde_json::to_string_pretty(&value).map_err(|err| err.to_string())
}
