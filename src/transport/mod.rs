/// Messaging transport trait and the Slack implementation
pub mod slack;

use crate::models::DashboardRecord;
use crate::render::MessageBody;
use async_trait::async_trait;

pub use slack::SlackClient;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to Slack failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("failed to decode Slack response: {0}")]
    Decode(String),
}

/// Where dashboard and notice messages are posted.
///
/// A posted message is addressed afterwards by `(channel, ts)`.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Post a new message and return its timestamp
    async fn post_message(&self, channel: &str, body: &MessageBody)
        -> Result<String, TransportError>;

    /// Rewrite an existing message in place
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        body: &MessageBody,
    ) -> Result<(), TransportError>;

    /// Message body for a dashboard record
    fn render_dashboard(&self, record: &DashboardRecord) -> MessageBody;
}
