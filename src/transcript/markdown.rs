use crate::transcript::{ExportDocument, ExportMessage};
use std::fmt::Write;

const REPLY_INDENT: &str = "  ";

/// Render a transcript as Markdown
///
/// Layout:
/// ```text
/// ## Slack Channel Transcript: #general
///
/// **Alice** (1970-01-01 00:16):
/// > Hello
///
///   **Bob** (1970-01-01 00:17):
///   > Hi back
///
/// ---
/// ```
/// Every thread, the last one included, is closed by `---`; nothing follows it.
pub fn render(doc: &ExportDocument) -> String {
    let mut out = format!("## Slack Channel Transcript: {}\n", doc.title);

    for thread in &doc.threads {
        out.push('\n');
        push_message(&mut out, &thread.root, "");

        for reply in &thread.thread {
            out.push('\n');
            push_message(&mut out, reply, REPLY_INDENT);
        }

        out.push_str("\n---\n");
    }

    out
}

fn push_message(out: &mut String, message: &ExportMessage, indent: &str) {
    let _ = writeln!(
        out,
        "{}**{}** ({}):",
        indent,
        escape_name(&message.user),
        message.timestamp
    );
    out.push_str(&blockquote(&message.text, indent));
}

/// Prefix every line with `> ` so multi-line text stays inside the quote
fn blockquote(text: &str, indent: &str) -> String {
    if text.is_empty() {
        return format!("{}>\n", indent);
    }

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                format!("{}>\n", indent)
            } else {
                format!("{}> {}\n", indent, line)
            }
        })
        .collect()
}

/// Names sit inside `**...**`, so a literal asterisk would end the bold span
fn escape_name(name: &str) -> String {
    name.replace('*', "\\*")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::{Message, MessageTs, Thread};
    use std::collections::BTreeMap;

    fn render_threads(
        title: &str,
        threads: &[Thread],
        names: &BTreeMap<String, String>,
        max_message_length: Option<usize>,
    ) -> String {
        render(&ExportDocument::build(title, threads, names, max_message_length))
    }

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

    fn names() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("U1".to_string(), "Alice".to_string()),
            ("U2".to_string(), "Bob".to_string()),
        ])
    }

    #[test]
    fn test_golden_single_thread() {
        let mut thread = Thread::new(message("U1", 1000.0, "Hello"));
        thread.replies.push(message("U2", 1050.0, "Hi back"));

        let output = render_threads("#general", &[thread], &names(), None);

        assert_eq!(
            output,
            "## Slack Channel Transcript: #general\n\
             \n\
             **Alice** (1970-01-01 00:16):\n\
             > Hello\n\
             \n\
             \x20\x20**Bob** (1970-01-01 00:17):\n\
             \x20\x20> Hi back\n\
             \n\
             ---\n"
        );
    }

    #[test]
    fn test_separator_between_threads() {
        let threads = vec![
            Thread::new(message("U1", 1000.0, "one")),
            Thread::new(message("U2", 2000.0, "two")),
        ];

        let output = render_threads("#general", &threads, &names(), None);

        assert_eq!(output.matches("\n---\n").count(), 2);
        assert!(output.ends_with("> two\n\n---\n"));
        assert!(output.contains("> one\n\n---\n\n**Bob**"));
    }

    #[test]
    fn test_empty_document_is_header_only() {
        let output = render_threads("#quiet", &[], &names(), None);
        assert_eq!(output, "## Slack Channel Transcript: #quiet\n");
    }

    #[test]
    fn test_multiline_text_stays_quoted() {
        let mut thread = Thread::new(message("U1", 1000.0, "line one\n\nline three"));
        thread.replies.push(message("U2", 1050.0, "a\r\nb"));

        let output = render_threads("#general", &[thread], &names(), None);

        assert!(output.contains("> line one\n>\n> line three\n"));
        assert!(output.contains("  > a\n  > b\n"));
    }

    #[test]
    fn test_empty_text_renders_bare_quote() {
        let thread = Thread::new(message("U1", 1000.0, "   "));
        let output = render_threads("#general", &[thread], &names(), None);
        assert!(output.contains("**Alice** (1970-01-01 00:16):\n>\n"));
    }

    #[test]
    fn test_text_is_verbatim() {
        let thread = Thread::new(message("U1", 1000.0, "use *bold* and `code` <https://x.io|x>"));
        let output = render_threads("#general", &[thread], &names(), None);
        assert!(output.contains("> use *bold* and `code` <https://x.io|x>\n"));
    }

    #[test]
    fn test_unknown_author_placeholder() {
        let thread = Thread::new(message("U404", 1000.0, "hi"));
        let output = render_threads("#general", &[thread], &names(), None);
        assert!(output.contains("**<@U404>** (1970-01-01 00:16):"));
    }

    #[test]
    fn test_name_asterisks_escaped() {
        let names = BTreeMap::from([("U1".to_string(), "*star*".to_string())]);
        let thread = Thread::new(message("U1", 1000.0, "hi"));
        let output = render_threads("#general", &[thread], &names, None);
        assert!(output.contains("**\\*star\\*** ("));
    }

    #[test]
    fn test_truncation() {
        let thread = Thread::new(message("U1", 1000.0, "abcdefghij"));
        let output = render_threads("#general", &[thread], &names(), Some(4));
        assert!(output.contains("> abcd...\n"));
    }
}
