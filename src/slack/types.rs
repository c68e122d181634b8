use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Slack message timestamp, e.g. `1761520471.000200`. Doubles as the message id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageTs(pub String);

impl MessageTs {
    pub fn new(ts: impl Into<String>) -> Self {
        Self(ts.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Seconds since the epoch, `None` if Slack sent something unparsable
    pub fn seconds(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|s| s.is_finite())
    }
}

/// A fetched channel message or thread reply
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// User id, or bot id for integrations; empty when Slack omits both
    pub author_id: String,
    /// Name Slack attached to an integration's post (`bot_profile.name` or `username`)
    pub author_name: Option<String>,
    pub ts: MessageTs,
    /// Numeric value of `ts`
    pub timestamp: f64,
    pub text: String,
    pub thread_ts: Option<MessageTs>,
    pub reply_count: Option<u32>,
    pub subtype: Option<String>,
}

impl Message {
    /// Whether this message is the root of a thread with replies to fetch
    pub fn has_replies(&self) -> bool {
        self.reply_count.unwrap_or(0) > 0 || self.thread_ts.as_ref() == Some(&self.ts)
    }

    /// Ascending by timestamp, ties broken by the raw ts string
    pub fn chronological(a: &Message, b: &Message) -> Ordering {
        a.timestamp
            .total_cmp(&b.timestamp)
            .then_with(|| a.ts.as_str().cmp(b.ts.as_str()))
    }
}

/// A root message and its replies, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub root: Message,
    pub replies: Vec<Message>,
}

impl Thread {
    pub fn new(root: Message) -> Self {
        Self {
            root,
            replies: Vec::new(),
        }
    }

    /// Every message of the thread, root first
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        std::iter::once(&self.root).chain(self.replies.iter())
    }
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(ts: &str) -> Message {
        Message {
            author_id: "U1".to_string(),
            author_name: None,
            ts: MessageTs::new(ts),
            timestamp: ts.parse().unwrap(),
            text: String::new(),
            thread_ts: None,
            reply_count: None,
            subtype: None,
        }
    }

    #[test]
    fn test_ts_seconds() {
        assert_eq!(MessageTs::new("1000.500000").seconds(), Some(1000.5));
        assert_eq!(MessageTs::new("not-a-ts").seconds(), None);
    }

    #[test]
    fn test_has_replies() {
        let mut msg = message("1000.000000");
        assert!(!msg.has_replies());

        msg.reply_count = Some(2);
        assert!(msg.has_replies());

        msg.reply_count = None;
        msg.thread_ts = Some(MessageTs::new("1000.000000"));
        assert!(msg.has_replies());

        // A reply broadcast to the channel points at a different root
        msg.thread_ts = Some(MessageTs::new("900.000000"));
        assert!(!msg.has_replies());
    }

    #[test]
    fn test_chronological_order() {
        let mut messages = vec![
            message("1050.000000"),
            message("1000.000100"),
            message("1000.000000"),
        ];
        messages.sort_by(Message::chronological);
        let order: Vec<_> = messages.iter().map(|m| m.ts.as_str()).collect();
        assert_eq!(order, ["1000.000000", "1000.000100", "1050.000000"]);
    }
}
