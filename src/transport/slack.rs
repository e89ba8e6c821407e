use super::{MessagingTransport, TransportError};
/// Slack Web API client for posting and editing messages
use crate::models::DashboardRecord;
use crate::render::{self, MessageBody};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<&'a str>,
    #[serde(flatten)]
    body: &'a MessageBody,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

pub struct SlackClient {
    client: Client,
    base_url: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(base_url: &str, bot_token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    async fn call(&self, method: &str, payload: &PostMessage<'_>) -> Result<SlackResponse, TransportError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api(format!("{} returned HTTP {}", method, status)));
        }

        let text = response.text().await?;
        let reply: SlackResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;
        if !reply.ok {
            return Err(TransportError::Api(
                reply.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(reply)
    }
}

#[async_trait]
impl MessagingTransport for SlackClient {
    async fn post_message(&self, channel: &str, body: &MessageBody) -> Result<String, TransportError> {
        let payload = PostMessage {
            channel,
            ts: None,
            body,
        };
        let reply = self.call("chat.postMessage", &payload).await?;
        reply
            .ts
            .ok_or_else(|| TransportError::Decode("chat.postMessage response has no ts".to_string()))
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        body: &MessageBody,
    ) -> Result<(), TransportError> {
        let payload = PostMessage {
            channel,
            ts: Some(ts),
            body,
        };
        self.call("chat.update", &payload).await?;
        Ok(())
    }

    fn render_dashboard(&self, record: &DashboardRecord) -> MessageBody {
        render::dashboard(record)
    }
}
