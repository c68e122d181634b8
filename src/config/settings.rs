use crate::cli::Cli;
use crate::error::{Result, TranscriptError};
use regex::Regex;
use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Jira Cloud "X commented on ABC-123 Title" notices
pub const DEFAULT_NOTIFICATION_PATTERN: &str = r"^@?.+ commented on [A-Z][A-Z0-9]*-\d+ .+$";

const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Clone)]
pub struct Settings {
    pub slack: SlackConfig,
    pub retry: RetryConfig,
    pub export: ExportConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
}

/// Backoff applied when Slack throttles a call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based) when the server gave no hint
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub channel: String,
    pub lookback_days: u32,
    pub output: Option<PathBuf>,
    pub save_json: bool,
    pub filter_notifications: bool,
    pub refresh_users: bool,
    pub max_message_length: Option<usize>,
    pub page_delay: Duration,
    pub bot_user_id: Option<String>,
    pub notification_pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
}

/// Load settings from `.env`, the process environment and the command line
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    Settings::from_cli(cli, |key| std::env::var(key).ok())
}

impl Settings {
    /// Build settings from parsed arguments and an environment lookup
    pub fn from_cli(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = non_empty(env("SLACK_BOT_TOKEN"))
            .or_else(|| non_empty(env("SLACK_TOKEN")))
            .ok_or_else(|| TranscriptError::Config("SLACK_BOT_TOKEN not set".to_string()))?;

        let slack = SlackConfig {
            bot_token: SecretString::new(bot_token),
            api_base_url: non_empty(env("SLACK_API_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        let retry = RetryConfig {
            max_retries: parse_var(&env, "SLACK_MAX_RETRIES", 5)?,
            base_delay: Duration::from_millis(parse_var(&env, "SLACK_RETRY_BASE_MS", 1000)?),
            max_delay: Duration::from_millis(parse_var(&env, "SLACK_RETRY_MAX_MS", 60_000)?),
        };

        if cli.channel.trim().is_empty() {
            return Err(TranscriptError::Config(
                "Channel ID must not be empty".to_string(),
            ));
        }
        if cli.days == 0 {
            return Err(TranscriptError::Config(
                "--days must be at least 1".to_string(),
            ));
        }

        if let Some(output) = cli.output.as_ref().filter(|_| cli.save_json) {
            if output.with_extension("json") == *output {
                return Err(TranscriptError::Config(format!(
                    "--output {} would be overwritten by --save-json; use a .md path",
                    output.display()
                )));
            }
        }

        let pattern = non_empty(env("NOTIFICATION_PATTERN"))
            .unwrap_or_else(|| DEFAULT_NOTIFICATION_PATTERN.to_string());
        let notification_pattern = Regex::new(&pattern).map_err(|e| {
            TranscriptError::Config(format!("Invalid NOTIFICATION_PATTERN: {}", e))
        })?;

        let export = ExportConfig {
            channel: cli.channel.trim().to_string(),
            lookback_days: cli.days,
            output: cli.output.clone(),
            save_json: cli.save_json,
            filter_notifications: cli.filter_notifications,
            refresh_users: cli.refresh_users,
            max_message_length: cli.max_length,
            page_delay: Duration::from_millis(parse_var(&env, "SLACK_PAGE_DELAY_MS", 1000)?),
            bot_user_id: non_empty(env("SLACK_BOT_USER_ID")),
            notification_pattern,
        };

        let cache = CacheConfig {
            path: directory_path(&env)?,
        };

        Ok(Settings {
            slack,
            retry,
            export,
            cache,
        })
    }
}

/// Returns path to the user directory file: ~/.slack_transcript/users.json
fn directory_path(env: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(path) = non_empty(env("USER_DIRECTORY_PATH")) {
        return Ok(PathBuf::from(path));
    }

    let base = match non_empty(env("SLACK_TRANSCRIPT_HOME")) {
        Some(home) => PathBuf::from(home),
        None => non_empty(env("HOME"))
            .map(|home| PathBuf::from(home).join(".slack_transcript"))
            .ok_or_else(|| {
                TranscriptError::Config(
                    "Cannot locate user directory: set HOME or SLACK_TRANSCRIPT_HOME".to_string(),
                )
            })?,
    };

    Ok(base.join("users.json"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match non_empty(env(key)) {
        Some(raw) => raw
            .parse()
            .map_err(|_| TranscriptError::Config(format!("Invalid {}", key))),
        None => Ok(default),
    }
}
