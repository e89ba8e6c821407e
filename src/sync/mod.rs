/// Reconciles the dashboard with the remote playback session
pub mod poller;

use crate::dashboard::{Dashboard, DashboardError, UpdateOutcome};
use crate::models::LastAction;
use crate::providers::{classify, PlaybackSession, RateLimit, RetryAfterError, SessionError};
use crate::render::MessageBody;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use poller::Poller;

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The dashboard was rewritten
    Updated(MessageBody),
    NoChangeNeeded,
    /// Spotify asked us to wait this long before calling again
    RateLimited(Duration),
    NoTrackPlaying,
    NoActiveDevice,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("rate limited by Spotify with an unusable Retry-After: {0}")]
    RetryAfter(#[from] RetryAfterError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
}

/// Fetches a snapshot and hands it to the dashboard.
///
/// Informational session states and rate limits come back as outcomes and
/// leave the dashboard untouched. Sleeping through a rate limit is up to the
/// caller: the poller does it, user interactions report it.
///
/// A rate limit seen on either path holds back poll ticks until the advised
/// delay has passed.
pub struct SyncDriver {
    session: Arc<dyn PlaybackSession>,
    dashboard: Arc<Dashboard>,
    backoff_until: Mutex<Option<Instant>>,
}

impl SyncDriver {
    pub fn new(session: Arc<dyn PlaybackSession>, dashboard: Arc<Dashboard>) -> Self {
        Self {
            session,
            dashboard,
            backoff_until: Mutex::new(None),
        }
    }

    /// One timer-driven pass; skips Spotify while a back-off is pending
    pub async fn poll_tick(&self) -> Result<TickOutcome, SyncError> {
        if let Some(remaining) = self.backoff_remaining().await {
            return Ok(TickOutcome::RateLimited(remaining));
        }
        self.reconcile(None).await
    }

    /// Pass following a button press, recording who pressed what
    pub async fn interaction_update(&self, action: &LastAction) -> Result<TickOutcome, SyncError> {
        self.reconcile(Some(action)).await
    }

    async fn reconcile(&self, action: Option<&LastAction>) -> Result<TickOutcome, SyncError> {
        let snapshot = match self.session.current_track().await {
            Ok(snapshot) => snapshot,
            Err(SessionError::NoTrackPlaying) => return Ok(TickOutcome::NoTrackPlaying),
            Err(SessionError::NoActiveDevice) => return Ok(TickOutcome::NoActiveDevice),
            Err(err) => {
                return match classify(&err)? {
                    RateLimit::Limited(delay) => {
                        *self.backoff_until.lock().await = Some(Instant::now() + delay);
                        Ok(TickOutcome::RateLimited(delay))
                    }
                    RateLimit::NotRateLimited => Err(err.into()),
                }
            }
        };

        match self.dashboard.update(&snapshot, action).await? {
            UpdateOutcome::Rendered(body) => Ok(TickOutcome::Updated(body)),
            UpdateOutcome::NoChangeNeeded => Ok(TickOutcome::NoChangeNeeded),
        }
    }

    /// Time left on the current back-off, clearing it once expired
    async fn backoff_remaining(&self) -> Option<Duration> {
        let mut backoff_until = self.backoff_until.lock().await;
        let deadline = (*backoff_until)?;
        let now = Instant::now();
        if now < deadline {
            Some(deadline - now)
        } else {
            *backoff_until = None;
            None
        }
    }

    pub fn session(&self) -> &Arc<dyn PlaybackSession> {
        &self.session
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }
}
