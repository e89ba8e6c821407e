/// Playback session trait and the Spotify implementation
pub mod rate_limit;
pub mod spotify;

use crate::models::{PlaybackSnapshot, QueueItem};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

pub use rate_limit::{classify, RateLimit, RetryAfterError};
pub use spotify::SpotifyClient;

/// Why a call against the remote playback session did not produce a result.
///
/// `NoTrackPlaying` and `NoActiveDevice` are expected states of the session,
/// not failures, and callers show them as friendly notices.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no track is currently playing")]
    NoTrackPlaying,
    #[error("no active device is currently playing anything")]
    NoActiveDevice,
    #[error(transparent)]
    Transient(#[from] TransientFailure),
}

/// Unexpected status, transport or decode failure
#[derive(Debug, thiserror::Error)]
pub enum TransientFailure {
    #[error("unexpected response from Spotify: HTTP {status}")]
    Http {
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },
    #[error("request to Spotify failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode Spotify response: {0}")]
    Decode(String),
}

impl SessionError {
    /// Informational outcomes are shown to users instead of being reported as errors
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::NoTrackPlaying | Self::NoActiveDevice)
    }

    /// HTTP status carried by the failure, if it came from a response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transient(TransientFailure::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient(TransientFailure::Network(err))
    }
}

/// Remote playback session the dashboard mirrors.
///
/// Each call is a single round trip and returns a typed outcome; implementations
/// never log.
#[async_trait]
pub trait PlaybackSession: Send + Sync {
    /// Id of the active playback device, `NoActiveDevice` when there is none
    async fn active_device(&self) -> Result<String, SessionError>;

    /// Read the current track, after checking that a device is active
    async fn current_track(&self) -> Result<PlaybackSnapshot, SessionError>;

    /// Pause playback on the active device
    async fn pause(&self) -> Result<(), SessionError>;

    /// Start or resume playback on the active device
    async fn resume(&self) -> Result<(), SessionError>;

    /// Skip to the next track
    async fn skip_next(&self) -> Result<(), SessionError>;

    /// Skip to the previous track
    async fn skip_previous(&self) -> Result<(), SessionError>;

    /// Upcoming tracks, at most `limit` of them
    async fn queue(&self, limit: usize) -> Result<Vec<QueueItem>, SessionError>;
}
