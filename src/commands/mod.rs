/// Slash command and button handlers
pub mod console;

use crate::auth::{AuthError, CredentialStore, OAuthFlow};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::models::{DashboardRecord, LastAction};
use crate::providers::{PlaybackSession, SessionError, SpotifyClient};
use crate::render::{self, actions, MessageBody};
use crate::sync::{Poller, SyncDriver, SyncError, TickOutcome};
use crate::transport::{MessagingTransport, SlackClient, TransportError};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

pub use console::ConsoleCommand;

/// Dashboard button presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    SkipNext,
    SkipPrevious,
    Play,
    Pause,
}

impl Interaction {
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id {
            actions::SKIP_NEXT => Some(Self::SkipNext),
            actions::SKIP_PREVIOUS => Some(Self::SkipPrevious),
            actions::PLAY => Some(Self::Play),
            actions::PAUSE => Some(Self::Pause),
            _ => None,
        }
    }

    pub fn action_id(self) -> &'static str {
        match self {
            Self::SkipNext => actions::SKIP_NEXT,
            Self::SkipPrevious => actions::SKIP_PREVIOUS,
            Self::Play => actions::PLAY,
            Self::Pause => actions::PAUSE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("Spotify is not connected")]
    NotConnected,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Composition root: owns the shared state and answers user commands
pub struct Bot {
    credentials: Arc<CredentialStore>,
    session: Arc<dyn PlaybackSession>,
    transport: Arc<dyn MessagingTransport>,
    driver: Arc<SyncDriver>,
    poller: Poller,
    oauth: Arc<OAuthFlow>,
    queue_limit: usize,
}

impl Bot {
    pub fn new(
        credentials: Arc<CredentialStore>,
        session: Arc<dyn PlaybackSession>,
        transport: Arc<dyn MessagingTransport>,
        oauth: Arc<OAuthFlow>,
        poll_interval: Duration,
        queue_limit: usize,
    ) -> Self {
        let dashboard = Arc::new(Dashboard::new(transport.clone()));
        let driver = Arc::new(SyncDriver::new(session.clone(), dashboard));
        let poller = Poller::new(driver.clone(), poll_interval);

        Self {
            credentials,
            session,
            transport,
            driver,
            poller,
            oauth,
            queue_limit,
        }
    }

    /// Wire up the Spotify and Slack clients described by `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();
        let credentials = Arc::new(CredentialStore::new());

        let session = SpotifyClient::new(&config.spotify.api_base_url, credentials.clone(), timeout)
            .context("Failed to build Spotify client")?;
        let bot_token = config
            .slack
            .bot_token
            .as_deref()
            .context("slack.bot_token is not configured")?;
        let transport = SlackClient::new(&config.slack.api_base_url, bot_token, timeout)
            .context("Failed to build Slack client")?;
        let oauth = OAuthFlow::new(&config.spotify, credentials.clone(), timeout)
            .context("Failed to set up Spotify OAuth")?;

        Ok(Self::new(
            credentials,
            Arc::new(session),
            Arc::new(transport),
            Arc::new(oauth),
            config.poll_interval(),
            config.dashboard.queue_limit,
        ))
    }

    pub fn oauth(&self) -> &Arc<OAuthFlow> {
        &self.oauth
    }

    pub fn driver(&self) -> &Arc<SyncDriver> {
        &self.driver
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    async fn post(&self, channel: &str, body: MessageBody) -> Result<MessageBody, CommandError> {
        self.transport.post_message(channel, &body).await?;
        Ok(body)
    }

    /// `/spotify`: post a fresh dashboard, anchor the record to it and make
    /// sure the poller is running
    pub async fn show_current_track(&self, channel: &str) -> Result<MessageBody, CommandError> {
        if !self.credentials.is_connected().await {
            return self.post(channel, render::not_connected()).await;
        }

        let snapshot = match self.session.current_track().await {
            Ok(snapshot) => snapshot,
            Err(e) => match render::session_notice(&e) {
                Some(notice) => return self.post(channel, notice).await,
                None => return Err(e.into()),
            },
        };

        let body = self
            .transport
            .render_dashboard(&DashboardRecord::anchored(&snapshot, channel, ""));
        let ts = self.transport.post_message(channel, &body).await?;
        self.driver.dashboard().create(&snapshot, channel, &ts).await;

        if self.poller.start().await {
            tracing::info!("Started polling for dashboard in {}", channel);
        }
        Ok(body)
    }

    /// `/spotify-queue`: post the next few tracks
    pub async fn show_queue(&self, channel: &str) -> Result<MessageBody, CommandError> {
        if !self.credentials.is_connected().await {
            return self.post(channel, render::not_connected()).await;
        }

        // The queue endpoint answers even with nothing playing, so check first
        if let Err(e) = self.session.current_track().await {
            return match render::session_notice(&e) {
                Some(notice) => self.post(channel, notice).await,
                None => Err(e.into()),
            };
        }

        let items = self.session.queue(self.queue_limit).await?;
        self.post(channel, render::queue(&items)).await
    }

    /// `/spotify-auth`: post a link that starts the OAuth flow
    pub async fn request_auth(&self, channel: &str) -> Result<MessageBody, CommandError> {
        let url = self.oauth.begin().await?;
        self.post(channel, render::auth_link(&url)).await
    }

    /// A dashboard button press by `user`.
    ///
    /// Sends the command to Spotify, then refreshes the dashboard with the
    /// action shown against the user's name.
    pub async fn handle_interaction(
        &self,
        action_id: &str,
        user: &str,
    ) -> Result<TickOutcome, CommandError> {
        let interaction = Interaction::from_action_id(action_id)
            .ok_or_else(|| CommandError::UnknownAction(action_id.to_string()))?;
        if !self.credentials.is_connected().await {
            return Err(CommandError::NotConnected);
        }

        match interaction {
            Interaction::SkipNext => self.session.skip_next().await?,
            Interaction::SkipPrevious => self.session.skip_previous().await?,
            Interaction::Play => self.session.resume().await?,
            Interaction::Pause => self.session.pause().await?,
        }
        tracing::info!(user, action = action_id, "Playback command sent");

        let action = LastAction::new(interaction.action_id(), user);
        let outcome = self.driver.interaction_update(&action).await?;
        if let TickOutcome::RateLimited(delay) = &outcome {
            tracing::warn!("Dashboard refresh rate limited, polling resumes in {:?}", delay);
        }
        Ok(outcome)
    }

    /// Stop background work
    pub async fn shutdown(&self) {
        self.poller.stop().await;
    }
}
