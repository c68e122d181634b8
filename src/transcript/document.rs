use crate::metadata::placeholder_name;
use crate::slack::{Message, Thread};
use chrono::DateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// A message with its author resolved and its timestamp formatted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportMessage {
    pub user: String,
    pub user_id: String,
    /// `YYYY-MM-DD HH:MM`, UTC
    pub timestamp: String,
    pub ts: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportThread {
    #[serde(flatten)]
    pub root: ExportMessage,
    pub thread: Vec<ExportMessage>,
}

/// Threads ready for rendering or JSON serialization
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub title: String,
    pub threads: Vec<ExportThread>,
}

impl ExportDocument {
    /// Resolve names and format timestamps; ids missing from `names` get a placeholder
    pub fn build(
        title: impl Into<String>,
        threads: &[Thread],
        names: &BTreeMap<String, String>,
        max_message_length: Option<usize>,
    ) -> Self {
        let export = |message: &Message| ExportMessage {
            user: names
                .get(&message.author_id)
                .cloned()
                .unwrap_or_else(|| placeholder_name(&message.author_id)),
            user_id: message.author_id.clone(),
            timestamp: format_timestamp(message.timestamp),
            ts: message.ts.as_str().to_string(),
            text: clean_text(&message.text, max_message_length),
        };

        Self {
            title: title.into(),
            threads: threads
                .iter()
                .map(|t| ExportThread {
                    root: export(&t.root),
                    thread: t.replies.iter().map(export).collect(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.threads)
    }
}

/// Epoch seconds as `YYYY-MM-DD HH:MM` in UTC
pub fn format_timestamp(seconds: f64) -> String {
    let secs = seconds.floor();
    let nanos = ((seconds - secs) * 1e9) as u32;

    if !secs.is_finite() || secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return "unknown time".to_string();
    }

    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

/// Trim, normalise line endings and optionally truncate to `max` characters
pub fn clean_text(text: &str, max: Option<usize>) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.trim();

    match max {
        Some(max) if text.chars().count() > max => {
            let cut: String = text.chars().take(max).collect();
            format!("{}...", cut.trim_end())
        }
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::MessageTs;

    fn message(user: &str, ts: f64, text: &str) -> Message {
        Message {
            author_id: user.to_string(),
            author_name: None,
            ts: MessageTs::new(format!("{:.6}", ts)),
            timestamp: ts,
            text: text.to_string(),
            thread_ts: None,
            reply_count: None,
            subtype: None,
        }
    }

    #[test]
    fn test_format_timestamp_utc() {
        assert_eq!(format_timestamp(1000.0), "1970-01-01 00:16");
        assert_eq!(format_timestamp(1761520471.000200), "2025-10-26 23:14");
        assert_eq!(format_timestamp(f64::NAN), "unknown time");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  hi\r\nthere \n", None), "hi\nthere");
        assert_eq!(clean_text("abcdef", Some(3)), "abc...");
        assert_eq!(clean_text("abc", Some(3)), "abc");
        assert_eq!(clean_text("héllo wörld", Some(5)), "héllo...");
    }

    #[test]
    fn test_build_resolves_names() {
        let mut thread = Thread::new(message("U1", 1000.0, "Hello"));
        thread.replies.push(message("U404", 1050.0, "Hi back"));
        let names = BTreeMap::from([("U1".to_string(), "Alice".to_string())]);

        let doc = ExportDocument::build("#general", &[thread], &names, None);

        assert_eq!(doc.threads[0].root.user, "Alice");
        assert_eq!(doc.threads[0].thread[0].user, "<@U404>");
        assert_eq!(doc.threads[0].thread[0].timestamp, "1970-01-01 00:17");
    }

    #[test]
    fn test_json_shape() {
        let mut thread = Thread::new(message("U1", 1000.0, "Hello"));
        thread.replies.push(message("U2", 1050.0, "Hi back"));
        let names = BTreeMap::from([
            ("U1".to_string(), "Alice".to_string()),
            ("U2".to_string(), "Bob".to_string()),
        ]);

        let doc = ExportDocument::build("#general", &[thread], &names, None);
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value[0]["user"], "Alice");
        assert_eq!(value[0]["text"], "Hello");
        assert_eq!(value[0]["ts"], "1000.000000");
        assert_eq!(value[0]["thread"][0]["user"], "Bob");
        assert_eq!(value[0]["thread"][0]["user_id"], "U2");
    }
}
