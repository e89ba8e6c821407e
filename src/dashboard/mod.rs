/// The single live dashboard message and its debounced updates
use crate::models::{DashboardRecord, LastAction, PlaybackSnapshot};
use crate::render::MessageBody;
use crate::transport::{MessagingTransport, TransportError};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("no dashboard message has been posted yet")]
    NotCreated,
    #[error("failed to edit dashboard message: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The message was rewritten with this body
    Rendered(MessageBody),
    /// The snapshot shows the same track and play state
    NoChangeNeeded,
}

/// Owns the dashboard record.
///
/// Compare, render, remote edit and commit all happen under one lock, so two
/// concurrent updates are applied one after the other and the record always
/// describes the last edit that reached the transport.
pub struct Dashboard {
    record: Mutex<Option<DashboardRecord>>,
    transport: Arc<dyn MessagingTransport>,
}

impl Dashboard {
    pub fn new(transport: Arc<dyn MessagingTransport>) -> Self {
        Self {
            record: Mutex::new(None),
            transport,
        }
    }

    /// Anchor the record to a freshly posted message, replacing any previous one
    pub async fn create(&self, snapshot: &PlaybackSnapshot, channel_id: &str, message_ts: &str) {
        let mut record = self.record.lock().await;
        *record = Some(DashboardRecord::anchored(snapshot, channel_id, message_ts));
        tracing::info!(channel = channel_id, ts = message_ts, "Dashboard message anchored");
    }

    /// Rewrite the message if `snapshot` changes what it shows.
    ///
    /// The record only advances once the transport accepted the edit; after a
    /// failure the next call sees the old record and tries again.
    pub async fn update(
        &self,
        snapshot: &PlaybackSnapshot,
        action: Option<&LastAction>,
    ) -> Result<UpdateOutcome, DashboardError> {
        let mut guard = self.record.lock().await;
        let current = guard.as_ref().ok_or(DashboardError::NotCreated)?;

        if !current.differs_from(snapshot) {
            return Ok(UpdateOutcome::NoChangeNeeded);
        }

        let next = current.advanced(snapshot, action);
        let body = self.transport.render_dashboard(&next);
        self.transport
            .update_message(&next.channel_id, &next.message_ts, &body)
            .await?;

        tracing::debug!(
            title = %next.title,
            is_playing = next.is_playing,
            "Dashboard message updated"
        );
        *guard = Some(next);
        Ok(UpdateOutcome::Rendered(body))
    }

    /// Copy of the current record
    pub async fn snapshot(&self) -> Option<DashboardRecord> {
        self.record.lock().await.clone()
    }
}
