/// Core data types shared across the dashboard synchronizer
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One read of the remote playback state.
///
/// Produced fresh by every call to the session client and never merged: a newer
/// snapshot always replaces an older one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub artist: String,
    pub title: String,
    pub artwork_url: String,
    pub is_playing: bool,
    pub active_device_id: String,
}

/// An upcoming track in the user's Spotify queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub artist: String,
    pub title: String,
    pub artwork_url: Option<String>,
    pub duration: Duration,
}

/// Who did what to the playback session, shown under the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAction {
    /// Button action id, e.g. `skip_next`
    pub label: String,
    /// Display name of the user who pressed it
    pub actor: String,
}

impl LastAction {
    pub fn new(label: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            actor: actor.into(),
        }
    }
}

/// What the posted dashboard message currently shows.
///
/// `(channel_id, message_ts)` is the routing key for every later rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub artist: String,
    pub title: String,
    pub artwork_url: String,
    pub is_playing: bool,
    pub active_device_id: String,
    pub channel_id: String,
    pub message_ts: String,
    pub last_action: Option<String>,
    pub last_actor: Option<String>,
}

impl DashboardRecord {
    /// Anchor a fresh record to a just-posted message
    pub fn anchored(snapshot: &PlaybackSnapshot, channel_id: &str, message_ts: &str) -> Self {
        Self {
            artist: snapshot.artist.clone(),
            title: snapshot.title.clone(),
            artwork_url: snapshot.artwork_url.clone(),
            is_playing: snapshot.is_playing,
            active_device_id: snapshot.active_device_id.clone(),
            channel_id: channel_id.to_string(),
            message_ts: message_ts.to_string(),
            last_action: None,
            last_actor: None,
        }
    }

    /// The record that results from applying `snapshot`, keeping the routing key
    pub fn advanced(&self, snapshot: &PlaybackSnapshot, action: Option<&LastAction>) -> Self {
        let mut next = Self::anchored(snapshot, &self.channel_id, &self.message_ts);
        if let Some(action) = action {
            next.last_action = Some(action.label.clone());
            next.last_actor = Some(action.actor.clone());
        }
        next
    }

    /// Whether `snapshot` would change what the message shows
    pub fn differs_from(&self, snapshot: &PlaybackSnapshot) -> bool {
        self.title != snapshot.title || self.is_playing != snapshot.is_playing
    }
}
