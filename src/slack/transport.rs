//! HTTP transport for Slack Web API calls
//!
//! The client only needs "GET an endpoint with query parameters, observe the
//! status, the `Retry-After` header and the body". Keeping that behind a
//! trait lets tests replay scripted responses without a network.

use crate::config::SlackConfig;
use crate::error::{Result, TranscriptError};
use async_trait::async_trait;
use reqwest::{Client, header};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Raw outcome of one HTTP call
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, if any
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `{base}/{endpoint}` with the given query parameters
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<HttpResponse>;
}

/// Transport backed by reqwest with the bot token as a default bearer header
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let bearer = format!("Bearer {}", config.bot_token.expose_secret());
        let mut auth = header::HeaderValue::from_str(&bearer).map_err(|_| {
            TranscriptError::Config("SLACK_BOT_TOKEN contains invalid characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<HttpResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.client.get(&url).query(params).send().await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await?;

        tracing::trace!(endpoint = %endpoint, status = status, "Slack API response");

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// `Retry-After` as Slack sends it: whole seconds
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
