use super::{PlaybackSession, SessionError, TransientFailure};
use crate::auth::CredentialStore;
/// Spotify Web API playback client
use crate::models::{PlaybackSnapshot, QueueItem};
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Spotify Web API wire types
#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct Device {
    id: Option<String>,
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    item: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album: Option<AlbumObject>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
struct QueueResponse {
    queue: Vec<TrackObject>,
}

impl TrackObject {
    fn artist(&self) -> String {
        self.artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown Artist".to_string())
    }

    /// Medium sized album art (Spotify lists images largest first)
    fn artwork_url(&self) -> Option<String> {
        let images = &self.album.as_ref()?.images;
        images.get(1).or_else(|| images.first()).map(|i| i.url.clone())
    }
}

/// Stateless request/response wrapper around the Spotify player endpoints.
///
/// The bearer token is read from the shared [`CredentialStore`] on every call.
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
}

impl SpotifyClient {
    pub fn new(
        base_url: &str,
        credentials: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response, SessionError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.credentials.get().await;

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(token.as_deref().unwrap_or_default());
        if method != Method::GET {
            // Player commands have no body but Spotify insists on a length
            request = request.header(CONTENT_LENGTH, 0);
        }

        Ok(request.send().await?)
    }

    /// Send a player command that answers 204 on success
    async fn command(&self, method: Method, path: &str) -> Result<(), SessionError> {
        let response = self.send(method, path).await?;
        if response.status() == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(failure(response).await)
        }
    }

    /// GET a JSON document, failing on anything but 200
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        let response = self.send(Method::GET, path).await?;
        if response.status() != StatusCode::OK {
            return Err(failure(response).await);
        }
        decode(response).await
    }
}

/// Capture everything the rate-limit classifier needs from a failed response
async fn failure(response: Response) -> SessionError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    SessionError::Transient(TransientFailure::Http {
        status,
        headers,
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SessionError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| TransientFailure::Decode(e.to_string()).into())
}

#[async_trait]
impl PlaybackSession for SpotifyClient {
    async fn active_device(&self) -> Result<String, SessionError> {
        let devices: DevicesResponse = self.fetch("/me/player/devices").await?;
        devices
            .devices
            .into_iter()
            .find(|d| d.is_active)
            .map(|d| d.id.unwrap_or_default())
            .ok_or(SessionError::NoActiveDevice)
    }

    async fn current_track(&self) -> Result<PlaybackSnapshot, SessionError> {
        let active_device_id = self.active_device().await?;

        let response = self
            .send(Method::GET, "/me/player/currently-playing")
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => return Err(SessionError::NoTrackPlaying),
            StatusCode::OK => {}
            _ => return Err(failure(response).await),
        }

        let playing: CurrentlyPlaying = decode(response).await?;
        // Ads and podcast episodes come back without a track item
        let item = playing.item.ok_or(SessionError::NoTrackPlaying)?;

        Ok(PlaybackSnapshot {
            artist: item.artist(),
            artwork_url: item.artwork_url().unwrap_or_default(),
            title: item.name,
            is_playing: playing.is_playing,
            active_device_id,
        })
    }

    async fn pause(&self) -> Result<(), SessionError> {
        self.command(Method::PUT, "/me/player/pause").await
    }

    async fn resume(&self) -> Result<(), SessionError> {
        self.command(Method::PUT, "/me/player/play").await
    }

    async fn skip_next(&self) -> Result<(), SessionError> {
        self.command(Method::POST, "/me/player/next").await
    }

    async fn skip_previous(&self) -> Result<(), SessionError> {
        self.command(Method::POST, "/me/player/previous").await
    }

    async fn queue(&self, limit: usize) -> Result<Vec<QueueItem>, SessionError> {
        let response: QueueResponse = self.fetch("/me/player/queue").await?;
        Ok(response
            .queue
            .into_iter()
            .take(limit)
            .map(|track| QueueItem {
                artist: track.artist(),
                artwork_url: track.artwork_url(),
                duration: Duration::from_millis(track.duration_ms),
                title: track.name,
            })
            .collect())
    }
}
