//! Rules for messages that never make it into a transcript

use crate::slack::Message;
use regex::Regex;

/// Membership noise Slack posts as messages
const SKIPPED_SUBTYPES: &[&str] = &["channel_join", "channel_leave"];

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    bot_user_id: Option<String>,
    notification_pattern: Option<Regex>,
}

impl MessageFilter {
    pub fn new(bot_user_id: Option<String>, notification_pattern: Option<Regex>) -> Self {
        Self {
            bot_user_id,
            notification_pattern,
        }
    }

    /// Whether `message` is dropped from the export
    pub fn excludes(&self, message: &Message) -> bool {
        if message
            .subtype
            .as_deref()
            .is_some_and(|subtype| SKIPPED_SUBTYPES.contains(&subtype))
        {
            return true;
        }

        if self.bot_user_id.as_deref() == Some(message.author_id.as_str()) {
            return true;
        }

        self.notification_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(message.text.trim()))
    }
}
