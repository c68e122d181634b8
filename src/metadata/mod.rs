//! Channel and user metadata
//!
//! The user directory maps user ids to display names and lives on disk
//! between runs, so most exports never touch `users.list`:
//! - Loaded once at startup; a missing or corrupt file means an empty directory
//! - Refreshed in bulk only when an author id is unknown (or on `--refresh-users`)
//! - Entries are never dropped, only added or updated
//! - Persisted atomically before names are handed to the renderer

mod cache;
pub(crate) mod types;

pub use cache::{UserDirectory, placeholder_name};
pub use types::{ChannelInfo, UserInfo};
