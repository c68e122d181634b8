//! Channel and user metadata as returned by the Slack Web API

use serde::Deserialize;

/// Channel metadata information
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    /// Channel ID (e.g., C09NU1KFXHT)
    pub id: String,

    /// Channel name without # (e.g., "engineering", "general")
    pub name: String,

    /// Is this a private channel?
    pub is_private: bool,

    /// Number of members (if available)
    pub member_count: Option<u32>,

    /// Topic/description (optional)
    pub topic: Option<String>,
}

impl ChannelInfo {
    /// Get display name with # prefix
    pub fn display_name(&self) -> String {
        format!("#{}", self.name)
    }

    /// Channel name reduced to characters that are safe in a file name
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = stem.trim_matches('.');
        if stem.is_empty() {
            self.id.clone()
        } else {
            stem.to_string()
        }
    }
}

/// User metadata information
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    /// User ID (e.g., U09JDBT2MCM)
    pub id: String,

    /// Username/handle (e.g., "john.doe")
    pub name: String,

    /// Real name (e.g., "John Doe")
    pub real_name: Option<String>,

    /// Display name (what shows in Slack)
    pub display_name: Option<String>,
}

impl UserInfo {
    /// Best available name for transcripts: real name, then display name, then handle
    pub fn best_name(&self) -> &str {
        [self.real_name.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChannel {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub num_members: Option<u32>,
    pub topic: Option<WireTopic>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTopic {
    #[serde(default)]
    pub value: String,
}

impl From<WireChannel> for ChannelInfo {
    fn from(channel: WireChannel) -> Self {
        Self {
            name: channel
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| channel.id.clone()),
            id: channel.id,
            is_private: channel.is_private,
            member_count: channel.num_members,
            topic: channel
                .topic
                .map(|t| t.value)
                .filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub real_name: Option<String>,
    pub profile: Option<WireProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireProfile {
    pub real_name: Option<String>,
    pub display_name: Option<String>,
}

impl From<WireUser> for UserInfo {
    fn from(user: WireUser) -> Self {
        let profile = user.profile;
        let real_name = user
            .real_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| profile.as_ref().and_then(|p| p.real_name.clone()));
        let name = if user.name.is_empty() {
            user.id.clone()
        } else {
            user.name
        };

        Self {
            id: user.id,
            name,
            real_name,
            display_name: profile.and_then(|p| p.display_name),
        }
    }
}
