//! Persistent user id -> display name directory

use crate::error::Result;
use crate::metadata::UserInfo;
use crate::slack::{SlackClient, Transport};
use crate::storage::write_atomic;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Name shown for an id the directory cannot resolve (deleted or external users)
pub fn placeholder_name(user_id: &str) -> String {
    if user_id.is_empty() {
        "Unknown".to_string()
    } else {
        format!("<@{}>", user_id)
    }
}

/// Integration ids (`B…`) never appear in `users.list`
fn is_bot_id(id: &str) -> bool {
    id.starts_with('B')
}

/// User directory backed by a JSON file
///
/// The file is a single JSON object `{ "U123": "Alice", ... }` with sorted
/// keys, so unchanged directories serialize byte-for-byte the same.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    /// Treat every requested id as missing on the next resolve
    refresh: bool,
}

impl UserDirectory {
    /// Load the directory at `path`
    ///
    /// A missing file yields an empty directory. An unreadable or corrupt one
    /// is logged and treated as empty too; the next save overwrites it.
    pub async fn load(path: impl Into<PathBuf>, refresh: bool) -> Self {
        let path = path.into();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "User directory is corrupt, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No user directory yet");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read user directory, starting empty"
                );
                BTreeMap::new()
            }
        };

        tracing::info!(
            path = %path.display(),
            users = entries.len(),
            refresh = refresh,
            "User directory loaded"
        );

        Self {
            path,
            entries,
            refresh,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&str> {
        self.entries.get(user_id).map(String::as_str)
    }

    /// Resolved name, or a visible placeholder for unknown ids
    pub fn display_name(&self, user_id: &str) -> String {
        self.get(user_id)
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_name(user_id))
    }

    /// Requested ids that need a fetch: unknown ones, or all of them when refreshing
    ///
    /// Bot ids are never listed: a user list fetch cannot resolve them.
    pub fn missing(&self, ids: &BTreeSet<String>) -> BTreeSet<String> {
        ids.iter()
            .filter(|id| !id.is_empty() && !is_bot_id(id))
            .filter(|id| self.refresh || !self.entries.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Add or update entries; returns how many ids were new
    pub fn merge(&mut self, users: impl IntoIterator<Item = UserInfo>) -> usize {
        self.merge_names(users.into_iter().map(|user| {
            let name = user.best_name().to_string();
            (user.id, name)
        }))
    }

    /// Add or update raw `(id, name)` pairs, e.g. integration names seen on messages
    pub fn merge_names(&mut self, names: impl IntoIterator<Item = (String, String)>) -> usize {
        let mut added = 0;
        for (id, name) in names {
            if self.entries.insert(id, name).is_none() {
                added += 1;
            }
        }
        added
    }

    /// Make sure every id in `ids` can be displayed, fetching the user list if needed
    ///
    /// The directory is persisted before returning, even when nothing was fetched.
    pub async fn resolve<T: Transport>(
        &mut self,
        ids: &BTreeSet<String>,
        client: &SlackClient<T>,
    ) -> Result<BTreeMap<String, String>> {
        let missing = self.missing(ids);

        if !missing.is_empty() {
            tracing::info!(
                missing = missing.len(),
                refresh = self.refresh,
                "Fetching workspace user list"
            );
            self.fetch_all(client).await?;
            self.refresh = false;

            let unresolved = missing
                .iter()
                .filter(|id| !self.entries.contains_key(id.as_str()))
                .count();
            if unresolved > 0 {
                tracing::warn!(
                    unresolved = unresolved,
                    "Some authors are not in the user list, using placeholders"
                );
            }
        }

        self.save()?;

        Ok(ids
            .iter()
            .map(|id| (id.clone(), self.display_name(id)))
            .collect())
    }

    async fn fetch_all<T: Transport>(&mut self, client: &SlackClient<T>) -> Result<()> {
        let mut cursor: Option<String> = None;
        let mut total = 0;

        loop {
            let page = client.users_page(cursor.as_deref()).await?;
            total += page.items.len();
            let added = self.merge(page.items);
            tracing::debug!(total = total, added = added, "Fetched user page");

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if total == 0 {
            tracing::warn!("No users fetched, check the token's users:read scope");
        }
        Ok(())
    }

    /// Persist the directory atomically
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), users = self.entries.len(), "User directory saved");
        Ok(())
    }
}
