//! End-to-end export: channel -> history -> names -> Markdown on disk

use crate::config::Settings;
use crate::error::Result;
use crate::logging::{Timer, log_error};
use crate::metadata::UserDirectory;
use crate::slack::{
    ChannelId, HistoryFetcher, MessageFilter, ReqwestTransport, SlackClient, Thread, Transport,
};
use crate::storage::{OutputPaths, write_atomic};
use crate::transcript::{ExportDocument, render};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// What a finished export produced
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub channel_name: String,
    pub threads: usize,
    pub replies: usize,
    pub failed_threads: usize,
    pub markdown_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

pub struct Exporter<T: Transport = ReqwestTransport> {
    settings: Settings,
    client: SlackClient<T>,
}

impl Exporter<ReqwestTransport> {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = SlackClient::new(&settings.slack, settings.retry.clone())?;
        Ok(Self::with_client(settings, client))
    }
}

impl<T: Transport> Exporter<T> {
    pub fn with_client(settings: Settings, client: SlackClient<T>) -> Self {
        Self { settings, client }
    }

    pub fn client(&self) -> &SlackClient<T> {
        &self.client
    }

    pub async fn run(&self) -> Result<ExportSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run the export with the lookback window ending at `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ExportSummary> {
        self.export(now)
            .await
            .inspect_err(|e| log_error("export", e))
    }

    async fn export(&self, now: DateTime<Utc>) -> Result<ExportSummary> {
        let _timer = Timer::new("export");
        let export = &self.settings.export;
        let channel = ChannelId::new(export.channel.clone());

        let info = self.client.get_channel_info(&channel).await?;
        tracing::info!(
            channel_id = %channel.as_str(),
            channel = %info.display_name(),
            private = info.is_private,
            members = ?info.member_count,
            topic = info.topic.as_deref().unwrap_or(""),
            "Channel resolved"
        );

        let bot_user_id = match &export.bot_user_id {
            Some(id) => id.clone(),
            None => self.client.auth_test().await?,
        };
        let filter = MessageFilter::new(
            Some(bot_user_id),
            export
                .filter_notifications
                .then(|| export.notification_pattern.clone()),
        );

        let since = (now.timestamp() - i64::from(export.lookback_days) * 86_400) as f64;
        let fetcher = HistoryFetcher::new(&self.client, filter, export.page_delay);
        let history = fetcher.fetch_history(&channel, since).await?;

        let author_ids = collect_author_ids(&history.threads);
        let mut directory =
            UserDirectory::load(self.settings.cache.path.clone(), export.refresh_users).await;
        directory.merge_names(collect_integration_names(&history.threads));
        let names = directory.resolve(&author_ids, &self.client).await?;
        tracing::debug!(authors = author_ids.len(), known = directory.len(), "Authors resolved");

        let document = ExportDocument::build(
            info.display_name(),
            &history.threads,
            &names,
            export.max_message_length,
        );
        let markdown = render(&document);

        let paths = OutputPaths::resolve(export.output.as_deref(), &info.file_stem());
        write_atomic(&paths.markdown, markdown.as_bytes())?;
        let json_path = if export.save_json {
            write_atomic(&paths.json, document.to_json()?.as_bytes())?;
            Some(paths.json)
        } else {
            None
        };

        tracing::info!(
            path = %paths.markdown.display(),
            threads = history.threads.len(),
            replies = history.reply_count(),
            "Transcript written"
        );

        Ok(ExportSummary {
            channel_name: info.name,
            threads: history.threads.len(),
            replies: history.reply_count(),
            failed_threads: history.failed_threads.len(),
            markdown_path: paths.markdown,
            json_path,
        })
    }
}

/// Distinct author ids across roots and replies
pub fn collect_author_ids(threads: &[Thread]) -> BTreeSet<String> {
    threads
        .iter()
        .flat_map(Thread::messages)
        .map(|m| m.author_id.clone())
        .collect()
}

/// Names integrations posted under, keyed by their bot id
pub fn collect_integration_names(threads: &[Thread]) -> BTreeMap<String, String> {
    threads
        .iter()
        .flat_map(Thread::messages)
        .filter(|m| !m.author_id.is_empty())
        .filter_map(|m| Some((m.author_id.clone(), m.author_name.clone()?)))
        .collect()
}
