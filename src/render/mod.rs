/// Slack message bodies for the dashboard, queue and notices
use crate::models::{DashboardRecord, QueueItem};
use crate::providers::SessionError;
use serde::Serialize;
use std::time::Duration;

/// Button action ids carried by the dashboard controls
pub mod actions {
    pub const SKIP_PREVIOUS: &str = "skip_previous";
    pub const SKIP_NEXT: &str = "skip_next";
    pub const PLAY: &str = "play";
    pub const PAUSE: &str = "pause";
}

const COLOR_ERROR: &str = "#FF0000";
const COLOR_INFO: &str = "#36a64f";

/// A complete message as sent to `chat.postMessage` / `chat.update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Image {
        image_url: String,
        alt_text: String,
    },
    Section {
        text: TextObject,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    Context {
        elements: Vec<TextObject>,
    },
    Actions {
        block_id: String,
        elements: Vec<ActionElement>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Image { image_url: String, alt_text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    Button {
        action_id: String,
        value: String,
        text: TextObject,
    },
}

impl TextObject {
    pub fn markdown(text: impl Into<String>) -> Self {
        Self::Markdown { text: text.into() }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain {
            text: text.into(),
            emoji: true,
        }
    }
}

fn button(action_id: &str, label: &str) -> ActionElement {
    ActionElement::Button {
        action_id: action_id.to_string(),
        value: action_id.to_string(),
        text: TextObject::plain(label),
    }
}

impl MessageBody {
    fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            text: None,
            attachments: vec![Attachment {
                color: None,
                text: None,
                blocks,
            }],
        }
    }

    fn notice(color: &str, text: &str) -> Self {
        Self {
            text: None,
            attachments: vec![Attachment {
                color: Some(color.to_string()),
                text: Some(text.to_string()),
                blocks: Vec::new(),
            }],
        }
    }
}

fn describe_action(label: &str) -> String {
    match label {
        actions::SKIP_NEXT => "⏩ skipped ahead".to_string(),
        actions::SKIP_PREVIOUS => "⏪ went back".to_string(),
        actions::PAUSE => "⏸️ paused".to_string(),
        actions::PLAY => "▶️ resumed".to_string(),
        other => other.to_string(),
    }
}

/// The live dashboard: artwork, track details, last action and controls
pub fn dashboard(record: &DashboardRecord) -> MessageBody {
    let mut blocks = Vec::with_capacity(4);

    // Slack rejects image blocks without a URL
    if !record.artwork_url.is_empty() {
        blocks.push(Block::Image {
            image_url: record.artwork_url.clone(),
            alt_text: "Album Cover".to_string(),
        });
    }

    blocks.push(Block::Section {
        text: TextObject::markdown(format!(
            "*Artist:* {}\n*Song:* {}",
            record.artist, record.title
        )),
        fields: Vec::new(),
        accessory: None,
    });

    if let (Some(label), Some(actor)) = (&record.last_action, &record.last_actor) {
        blocks.push(Block::Context {
            elements: vec![TextObject::markdown(format!(
                "{} by *{}*",
                describe_action(label),
                actor
            ))],
        });
    }

    let play_pause = if record.is_playing {
        button(actions::PAUSE, "⏸️")
    } else {
        button(actions::PLAY, "▶️")
    };
    blocks.push(Block::Actions {
        block_id: "controls".to_string(),
        elements: vec![
            button(actions::SKIP_PREVIOUS, "⏪"),
            play_pause,
            button(actions::SKIP_NEXT, "⏩"),
        ],
    });

    MessageBody::from_blocks(blocks)
}

/// `m:ss`
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Upcoming tracks, numbered from 1
pub fn queue(items: &[QueueItem]) -> MessageBody {
    if items.is_empty() {
        return info("The queue is empty.");
    }

    let blocks = items
        .iter()
        .enumerate()
        .map(|(i, item)| Block::Section {
            text: TextObject::plain(format!("#{}", i + 1)),
            fields: vec![TextObject::markdown(format!(
                "*{}*\t\t\t{}\t\t\t{}",
                item.title,
                item.artist,
                format_duration(item.duration)
            ))],
            accessory: item
                .artwork_url
                .as_ref()
                .filter(|url| !url.is_empty())
                .map(|url| Accessory::Image {
                    image_url: url.clone(),
                    alt_text: "album logo".to_string(),
                }),
        })
        .collect();

    MessageBody::from_blocks(blocks)
}

/// Shown when no Spotify token has been stored yet
pub fn not_connected() -> MessageBody {
    MessageBody::notice(
        COLOR_ERROR,
        "Not connected to Spotify. Run /spotify-auth to enable this!",
    )
}

pub fn info(text: &str) -> MessageBody {
    MessageBody::notice(COLOR_INFO, text)
}

/// Friendly notice for expected session states, `None` for real failures
pub fn session_notice(error: &SessionError) -> Option<MessageBody> {
    match error {
        SessionError::NoTrackPlaying => Some(info("No track is currently playing.")),
        SessionError::NoActiveDevice => {
            Some(info("No active device is currently playing anything!"))
        }
        SessionError::Transient(_) => None,
    }
}

pub fn auth_link(url: &str) -> MessageBody {
    MessageBody {
        text: Some(format!(
            "Let's go!\nClick <{}|here> to authenticate with Spotify and let's get this party started 🎶",
            url
        )),
        attachments: Vec::new(),
    }
}
