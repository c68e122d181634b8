//! Paginated channel history with thread replies

use crate::error::{Result, TranscriptError};
use crate::logging::Timer;
use crate::slack::{ChannelId, Message, MessageFilter, MessageTs, SlackClient, Thread, Transport};
use std::time::Duration;

/// Threads fetched for one channel
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Top-level threads, oldest root first
    pub threads: Vec<Thread>,
    /// Roots whose replies could not be fetched; they are kept without replies
    pub failed_threads: Vec<MessageTs>,
    /// Messages dropped by the filter
    pub excluded: usize,
}

impl History {
    pub fn reply_count(&self) -> usize {
        self.threads.iter().map(|t| t.replies.len()).sum()
    }
}

pub struct HistoryFetcher<'a, T: Transport> {
    client: &'a SlackClient<T>,
    filter: MessageFilter,
    page_delay: Duration,
}

impl<'a, T: Transport> HistoryFetcher<'a, T> {
    pub fn new(client: &'a SlackClient<T>, filter: MessageFilter, page_delay: Duration) -> Self {
        Self {
            client,
            filter,
            page_delay,
        }
    }

    /// Fetch every message posted at or after `since` (epoch seconds), with replies
    ///
    /// A Slack API error while fetching one thread's replies is logged and
    /// that thread is kept with no replies. Every other error aborts.
    pub async fn fetch_history(&self, channel: &ChannelId, since: f64) -> Result<History> {
        let _timer = Timer::new("fetch_history");
        let oldest = format!("{:.6}", since);

        let mut history = History::default();
        let mut roots = Vec::new();
        let mut cursor: Option<String> = None;
        let mut total = 0;

        loop {
            let page = self
                .client
                .history_page(channel, &oldest, cursor.as_deref())
                .await?;
            total += page.items.len();
            tracing::info!(
                channel_id = %channel.as_str(),
                batch = page.items.len(),
                total = total,
                "Fetched history page"
            );

            for message in page.items {
                if message.timestamp < since {
                    continue;
                }
                if self.filter.excludes(&message) {
                    history.excluded += 1;
                    continue;
                }
                roots.push(message);
            }

            match page.next_cursor {
                Some(next) => {
                    cursor = Some(next);
                    if !self.page_delay.is_zero() {
                        tokio::time::sleep(self.page_delay).await;
                    }
                }
                None => break,
            }
        }

        roots.sort_by(Message::chronological);
        roots.dedup_by(|a, b| a.ts == b.ts);

        for root in roots {
            let mut thread = Thread::new(root);

            if thread.root.has_replies() {
                match self.fetch_replies(channel, &thread.root.ts).await {
                    Ok(replies) => {
                        for reply in replies {
                            if self.filter.excludes(&reply) {
                                history.excluded += 1;
                            } else {
                                thread.replies.push(reply);
                            }
                        }
                    }
                    Err(e @ TranscriptError::SlackApi { .. }) => {
                        tracing::warn!(
                            channel_id = %channel.as_str(),
                            thread_ts = %thread.root.ts.as_str(),
                            error = %e,
                            "Failed to fetch thread replies, keeping the thread without them"
                        );
                        history.failed_threads.push(thread.root.ts.clone());
                    }
                    Err(e) => return Err(e),
                }
            }

            history.threads.push(thread);
        }

        tracing::info!(
            channel_id = %channel.as_str(),
            threads = history.threads.len(),
            replies = history.reply_count(),
            excluded = history.excluded,
            failed_threads = history.failed_threads.len(),
            "History fetched"
        );

        Ok(history)
    }

    /// All replies of one thread, oldest first, root excluded
    pub async fn fetch_replies(
        &self,
        channel: &ChannelId,
        thread_ts: &MessageTs,
    ) -> Result<Vec<Message>> {
        let mut replies = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .client
                .replies_page(channel, thread_ts, cursor.as_deref())
                .await?;
            replies.extend(page.items.into_iter().filter(|m| &m.ts != thread_ts));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        replies.sort_by(Message::chronological);
        replies.dedup_by(|a, b| a.ts == b.ts);

        tracing::debug!(
            thread_ts = %thread_ts.as_str(),
            replies = replies.len(),
            "Fetched thread replies"
        );

        Ok(replies)
    }
}
