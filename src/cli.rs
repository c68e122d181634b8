use clap::Parser;
use std::path::PathBuf;

/// Export a Slack channel's history as a threaded Markdown transcript
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Channel ID to export (e.g. C09NU1KFXHT)
    pub channel: String,

    /// How many days of history to include
    #[arg(long, default_value_t = 730)]
    pub days: u32,

    /// Output Markdown file (defaults to slack_export_<channel name>.md)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the resolved threads as JSON next to the Markdown file
    #[arg(long)]
    pub save_json: bool,

    /// Drop third-party notification messages (Jira comment notices by default)
    #[arg(long)]
    pub filter_notifications: bool,

    /// Ignore the cached user directory and fetch every user again
    #[arg(long)]
    pub refresh_users: bool,

    /// Truncate message text longer than this many characters
    #[arg(long, value_name = "CHARS")]
    pub max_length: Option<usize>,
}
