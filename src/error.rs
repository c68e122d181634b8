use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Slack API error from {endpoint}: {code}")]
    SlackApi { endpoint: String, code: String },

    #[error("Rate limit exceeded on {endpoint} after {attempts} retries")]
    RateLimitExceeded { endpoint: String, attempts: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TranscriptError {
    pub fn api(endpoint: impl Into<String>, code: impl Into<String>) -> Self {
        Self::SlackApi {
            endpoint: endpoint.into(),
            code: code.into(),
        }
    }

    pub fn invalid_response(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error: 2 for bad configuration, 1 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
