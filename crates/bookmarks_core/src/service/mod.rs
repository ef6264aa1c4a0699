//! Bookmark use-case services.
//!
//! # Responsibility
//! - Orchestrate engines and repository into create/update/delete/reorder
//!   and delta read APIs.
//! - Serialize writers per channel and publish post-commit events.

pub mod bookmark_service;
pub mod channel_locks;
pub mod notify;
