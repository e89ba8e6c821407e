/// Spotify credentials and the authorization-code flow
pub mod server;

use crate::config::SpotifyConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use url::Url;

pub use server::start_oauth_server;

/// How long an issued state stays valid
const STATE_TTL: Duration = Duration::from_secs(600);
/// Oldest states are dropped beyond this many outstanding logins
const MAX_PENDING_STATES: usize = 256;

/// Holds the current Spotify access token.
///
/// The token is swapped as a whole, so readers see either the old or the new
/// value and never a partial one.
#[derive(Debug, Default)]
pub struct CredentialStore {
    token: RwLock<Option<Arc<str>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored token; an empty token clears it
    pub async fn set(&self, token: &str) {
        let next = if token.is_empty() {
            None
        } else {
            Some(Arc::from(token))
        };
        *self.token.write().await = next;
    }

    /// Current token, or `None` before the first successful login
    pub async fn get(&self) -> Option<Arc<str>> {
        self.token.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.token.read().await.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid OAuth URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unknown or already used OAuth state")]
    UnknownState,
    #[error("token request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenEndpoint { status: StatusCode, body: String },
    #[error("token response did not contain an access token")]
    MissingToken,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Authorization-code flow against the Spotify accounts service.
///
/// Every authorize URL carries a fresh one-time `state`; the callback must
/// present one of those before the code is exchanged. States expire after
/// ten minutes and at most `MAX_PENDING_STATES` are kept.
pub struct OAuthFlow {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    scopes: String,
    credentials: Arc<CredentialStore>,
    pending_states: Mutex<HashMap<String, Instant>>,
    http: Client,
}

impl OAuthFlow {
    pub fn new(
        spotify: &SpotifyConfig,
        credentials: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        // Fail early on a bad redirect URI rather than at callback time
        Url::parse(&spotify.redirect_uri)?;

        Ok(Self {
            client_id: spotify.client_id.clone().unwrap_or_default(),
            client_secret: spotify.client_secret.clone().unwrap_or_default(),
            redirect_uri: spotify.redirect_uri.clone(),
            authorize_url: spotify.authorize_url.clone(),
            token_url: spotify.token_url.clone(),
            scopes: spotify.scopes.clone(),
            credentials,
            pending_states: Mutex::new(HashMap::new()),
            http: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Start a login: remember a new state and return the authorize URL for it
    pub async fn begin(&self) -> Result<String, AuthError> {
        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = self.authorize_url_for(&state)?;

        let now = Instant::now();
        let mut pending = self.pending_states.lock().await;
        pending.retain(|_, issued| now.duration_since(*issued) < STATE_TTL);
        if pending.len() >= MAX_PENDING_STATES {
            let oldest = pending
                .iter()
                .min_by_key(|(_, issued)| **issued)
                .map(|(state, _)| state.clone());
            if let Some(oldest) = oldest {
                pending.remove(&oldest);
            }
        }
        pending.insert(state, now);
        Ok(url)
    }

    /// Authorize URL for a given state
    pub fn authorize_url_for(&self, state: &str) -> Result<String, AuthError> {
        let url = Url::parse_with_params(
            &self.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("scope", self.scopes.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Path component of the redirect URI, where the callback arrives
    pub fn callback_path(&self) -> String {
        Url::parse(&self.redirect_uri)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| "/callback".to_string())
    }

    /// Exchange an authorization code for an access token and store it
    pub async fn complete(&self, code: &str, state: &str) -> Result<(), AuthError> {
        let issued = self.pending_states.lock().await.remove(state);
        match issued {
            Some(issued) if issued.elapsed() < STATE_TTL => {}
            _ => return Err(AuthError::UnknownState),
        }

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint { status, body });
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.credentials.set(&access_token).await;
        tracing::info!("Spotify access token stored");
        Ok(())
    }
}
