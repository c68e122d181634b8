use crate::config::{RetryConfig, SlackConfig};
use crate::error::{Result, TranscriptError};
use crate::metadata::types::{WireChannel, WireUser};
use crate::metadata::{ChannelInfo, UserInfo};
use crate::slack::transport::{HttpResponse, ReqwestTransport, Transport};
use crate::slack::{ChannelId, Message, MessageTs, Page};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const PAGE_LIMIT: &str = "200";

/// Slack Web API client with backoff on throttling
pub struct SlackClient<T: Transport = ReqwestTransport> {
    transport: T,
    retry: RetryConfig,
}

impl SlackClient<ReqwestTransport> {
    pub fn new(config: &SlackConfig, retry: RetryConfig) -> Result<Self> {
        Ok(Self::with_transport(ReqwestTransport::new(config)?, retry))
    }
}

enum Outcome {
    Done(Value),
    Throttled(Option<Duration>),
}

impl<T: Transport> SlackClient<T> {
    pub fn with_transport(transport: T, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call a Web API method and return its JSON body
    ///
    /// Throttled calls (HTTP 429 or `ratelimited`) are retried after the
    /// server's `Retry-After`, or after an exponential backoff when there is
    /// none. Fails with `RateLimitExceeded` once `max_retries` is used up.
    pub async fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut retries = 0;

        loop {
            let response = self.transport.get(endpoint, params).await?;

            match classify(endpoint, response)? {
                Outcome::Done(body) => {
                    if retries > 0 {
                        tracing::debug!(endpoint = %endpoint, retries = retries, "Call succeeded after retry");
                    }
                    return Ok(body);
                }
                Outcome::Throttled(hint) => {
                    if retries >= self.retry.max_retries {
                        tracing::warn!(
                            endpoint = %endpoint,
                            retries = retries,
                            "Rate limit retries exhausted"
                        );
                        return Err(TranscriptError::RateLimitExceeded {
                            endpoint: endpoint.to_string(),
                            attempts: retries,
                        });
                    }

                    retries += 1;
                    let delay = hint.unwrap_or_else(|| self.retry.delay_for_attempt(retries));
                    tracing::warn!(
                        endpoint = %endpoint,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        server_hint = hint.is_some(),
                        "Rate limited by Slack, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Bot user id behind the token (`auth.test`)
    pub async fn auth_test(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct AuthTest {
            user_id: String,
        }

        let body = self.call("auth.test", &[]).await?;
        let auth: AuthTest = decode("auth.test", body)?;
        Ok(auth.user_id)
    }

    /// Get channel information from Slack API
    pub async fn get_channel_info(&self, channel: &ChannelId) -> Result<ChannelInfo> {
        #[derive(Deserialize)]
        struct InfoResponse {
            channel: WireChannel,
        }

        let body = self
            .call(
                "conversations.info",
                &[("channel", channel.as_str().to_string())],
            )
            .await?;
        let response: InfoResponse = decode("conversations.info", body)?;
        Ok(response.channel.into())
    }

    /// One page of channel history, newest first as Slack returns it
    pub async fn history_page(
        &self,
        channel: &ChannelId,
        oldest: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Message>> {
        let mut params = vec![
            ("channel", channel.as_str().to_string()),
            ("oldest", oldest.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let body = self.call("conversations.history", &params).await?;
        messages_page("conversations.history", body)
    }

    /// One page of a thread, root message included
    pub async fn replies_page(
        &self,
        channel: &ChannelId,
        thread_ts: &MessageTs,
        cursor: Option<&str>,
    ) -> Result<Page<Message>> {
        let mut params = vec![
            ("channel", channel.as_str().to_string()),
            ("ts", thread_ts.as_str().to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let body = self.call("conversations.replies", &params).await?;
        messages_page("conversations.replies", body)
    }

    /// One page of the workspace member list
    pub async fn users_page(&self, cursor: Option<&str>) -> Result<Page<UserInfo>> {
        #[derive(Deserialize)]
        struct UsersResponse {
            #[serde(default)]
            members: Vec<WireUser>,
            response_metadata: Option<ResponseMetadata>,
        }

        let mut params = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        let body = self.call("users.list", &params).await?;
        let response: UsersResponse = decode("users.list", body)?;

        Ok(Page {
            items: response.members.into_iter().map(UserInfo::from).collect(),
            next_cursor: response.response_metadata.and_then(|m| m.cursor()),
        })
    }
}

fn classify(endpoint: &str, response: HttpResponse) -> Result<Outcome> {
    if response.status == 429 {
        return Ok(Outcome::Throttled(response.retry_after));
    }
    if !response.is_success() {
        return Err(TranscriptError::api(
            endpoint,
            format!("http_{}", response.status),
        ));
    }

    let body: Value = serde_json::from_str(&response.body)
        .map_err(|e| TranscriptError::invalid_response(endpoint, e.to_string()))?;

    match body.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(Outcome::Done(body)),
        Some(false) => {
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            if code == "ratelimited" {
                Ok(Outcome::Throttled(response.retry_after))
            } else {
                Err(TranscriptError::api(endpoint, code))
            }
        }
        None => Err(TranscriptError::invalid_response(
            endpoint,
            "missing \"ok\" field",
        )),
    }
}

fn decode<D: DeserializeOwned>(endpoint: &str, body: Value) -> Result<D> {
    serde_json::from_value(body).map_err(|e| TranscriptError::invalid_response(endpoint, e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

impl ResponseMetadata {
    fn cursor(self) -> Option<String> {
        Some(self.next_cursor).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    user: Option<String>,
    bot_id: Option<String>,
    username: Option<String>,
    bot_profile: Option<WireBotProfile>,
    #[serde(default)]
    text: String,
    ts: String,
    thread_ts: Option<String>,
    reply_count: Option<u32>,
    subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBotProfile {
    name: Option<String>,
}

impl WireMessage {
    fn into_message(self, endpoint: &str) -> Result<Message> {
        let ts = MessageTs::new(self.ts);
        let timestamp = ts.seconds().ok_or_else(|| {
            TranscriptError::invalid_response(endpoint, format!("bad message ts {:?}", ts.as_str()))
        })?;

        // Users resolve through the directory; only integrations carry their own name
        let author_name = if self.user.is_none() {
            self.bot_profile
                .and_then(|p| p.name)
                .or(self.username)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
        } else {
            None
        };

        Ok(Message {
            author_id: self.user.or(self.bot_id).unwrap_or_default(),
            author_name,
            ts,
            timestamp,
            text: self.text,
            thread_ts: self.thread_ts.map(MessageTs::new),
            reply_count: self.reply_count,
            subtype: self.subtype,
        })
    }
}

fn messages_page(endpoint: &str, body: Value) -> Result<Page<Message>> {
    #[derive(Deserialize)]
    struct MessagesResponse {
        #[serde(default)]
        messages: Vec<WireMessage>,
        #[serde(default)]
        has_more: bool,
        response_metadata: Option<ResponseMetadata>,
    }

    let response: MessagesResponse = decode(endpoint, body)?;
    let items = response
        .messages
        .into_iter()
        .map(|m| m.into_message(endpoint))
        .collect::<Result<Vec<_>>>()?;
    let next_cursor = if response.has_more {
        response.response_metadata.and_then(|m| m.cursor())
    } else {
        None
    };

    Ok(Page { items, next_cursor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::MockTransport;
    use serde_json::json;

    fn client(mock: MockTransport) -> SlackClient<MockTransport> {
        SlackClient::with_transport(
            mock,
            RetryConfig {
                max_retries: 3,
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_growing_backoff() {
        let mock = MockTransport::new();
        mock.push_throttled("users.list", None)
            .push_throttled("users.list", None)
            .push_throttled("users.list", None)
            .push_json("users.list", json!({"ok": true, "members": []}));
        let client = client(mock);

        let body = client.call("users.list", &[]).await.unwrap();
        assert_eq!(body["ok"], true);

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 4);
        let waits: Vec<Duration> = requests.windows(2).map(|w| w[1].at - w[0].at).collect();
        assert_eq!(
            waits,
            [
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_honours_retry_after() {
        let mock = MockTransport::new();
        mock.push_throttled("auth.test", Some(Duration::from_secs(7)))
            .push_json("auth.test", json!({"ok": true, "user_id": "UBOT"}));
        let client = client(mock);

        assert_eq!(client.auth_test().await.unwrap(), "UBOT");
        let requests = client.transport().requests();
        assert_eq!(requests[1].at - requests[0].at, Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ratelimited_body_is_retried() {
        let mock = MockTransport::new();
        mock.push_json("auth.test", json!({"ok": false, "error": "ratelimited"}))
            .push_json("auth.test", json!({"ok": true, "user_id": "UBOT"}));
        let client = client(mock);

        assert_eq!(client.auth_test().await.unwrap(), "UBOT");
        assert_eq!(client.transport().requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exceeded() {
        let mock = MockTransport::new();
        for _ in 0..4 {
            mock.push_throttled("users.list", None);
        }
        let client = client(mock);

        let err = client.call("users.list", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::RateLimitExceeded { attempts: 3, .. }
        ));
        assert_eq!(client.transport().requests().len(), 4);
    }

    #[tokio::test]
    async fn test_api_error_carries_code() {
        let mock = MockTransport::new();
        mock.push_json(
            "conversations.info",
            json!({"ok": false, "error": "channel_not_found"}),
        );
        let client = client(mock);

        let err = client
            .get_channel_info(&ChannelId::new("C404"))
            .await
            .unwrap_err();
        match err {
            TranscriptError::SlackApi { endpoint, code } => {
                assert_eq!(endpoint, "conversations.info");
                assert_eq!(code, "channel_not_found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_not_retried() {
        let mock = MockTransport::new();
        mock.push(
            "users.list",
            HttpResponse {
                status: 500,
                retry_after: None,
                body: "oops".to_string(),
            },
        );
        let client = client(mock);

        let err = client.call("users.list", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Slack API error from users.list: http_500");
        assert_eq!(client.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_history_page_parsing() {
        let mock = MockTransport::new();
        mock.push_json(
            "conversations.history",
            json!({
                "ok": true,
                "messages": [
                    {"type": "message", "user": "U1", "text": "hi", "ts": "1050.000100",
                     "thread_ts": "1050.000100", "reply_count": 2},
                    {"type": "message", "bot_id": "B9", "text": "deploy done", "ts": "1000.000000",
                     "bot_profile": {"id": "B9", "name": "Deploy Bot"}},
                    {"type": "message", "bot_id": "B7", "username": "webhook", "text": "ping", "ts": "990.000000"}
                ],
                "has_more": true,
                "response_metadata": {"next_cursor": "bmV4dA=="}
            }),
        );
        let client = client(mock);

        let page = client
            .history_page(&ChannelId::new("C1"), "900.000000", None)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].author_id, "U1");
        assert_eq!(page.items[0].author_name, None);
        assert_eq!(page.items[0].reply_count, Some(2));
        assert_eq!(page.items[1].author_id, "B9");
        assert_eq!(page.items[1].author_name.as_deref(), Some("Deploy Bot"));
        assert_eq!(page.items[1].timestamp, 1000.0);
        assert_eq!(page.items[2].author_name.as_deref(), Some("webhook"));
        assert_eq!(page.next_cursor.as_deref(), Some("bmV4dA=="));

        let request = &client.transport().requests()[0];
        assert_eq!(request.param("channel"), Some("C1"));
        assert_eq!(request.param("oldest"), Some("900.000000"));
        assert_eq!(request.param("limit"), Some("200"));
        assert_eq!(request.param("cursor"), None);
    }

    #[tokio::test]
    async fn test_no_cursor_without_has_more() {
        let mock = MockTransport::new();
        mock.push_json(
            "conversations.replies",
            json!({
                "ok": true,
                "messages": [],
                "has_more": false,
                "response_metadata": {"next_cursor": "stale"}
            }),
        );
        let client = client(mock);

        let page = client
            .replies_page(&ChannelId::new("C1"), &MessageTs::new("1.0"), Some("abc"))
            .await
            .unwrap();
        assert!(page.next_cursor.is_none());
        assert_eq!(client.transport().requests()[0].param("cursor"), Some("abc"));
    }

    #[tokio::test]
    async fn test_bad_ts_is_invalid_response() {
        let mock = MockTransport::new();
        mock.push_json(
            "conversations.history",
            json!({"ok": true, "messages": [{"user": "U1", "text": "x", "ts": "yesterday"}]}),
        );
        let client = client(mock);

        let err = client
            .history_page(&ChannelId::new("C1"), "0", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptError::InvalidResponse { .. }));
    }
}
