/// Line-based operator console standing in for Slack's inbound events
use super::{Bot, CommandError, Interaction};
use crate::sync::TickOutcome;

pub const HELP: &str = "\
Commands:
  spotify                      post the live dashboard
  queue                        post the upcoming tracks
  auth                         post a Spotify login link
  skip_next|skip_previous|play|pause [user]
                               press a dashboard button
  stop                         stop polling
  help                         show this help
  quit                         exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    ShowCurrentTrack,
    ShowQueue,
    RequestAuth,
    Press { action_id: String, user: Option<String> },
    StopPolling,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unrecognised command: {0} (try `help`)")]
pub struct ParseError(pub String);

impl ConsoleCommand {
    /// Parse one input line; blank lines yield `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let head = head.trim_start_matches('/');

        let command = match head {
            "spotify" | "show" => Self::ShowCurrentTrack,
            "spotify-queue" | "queue" => Self::ShowQueue,
            "spotify-auth" | "auth" => Self::RequestAuth,
            "stop" => Self::StopPolling,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other if Interaction::from_action_id(other).is_some() => Self::Press {
                action_id: other.to_string(),
                user: words.next().map(str::to_string),
            },
            other => return Err(ParseError(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Run the command against `bot`, returning a line to print
    pub async fn dispatch(
        &self,
        bot: &Bot,
        channel: &str,
        default_user: &str,
    ) -> Result<String, CommandError> {
        match self {
            Self::ShowCurrentTrack => {
                bot.show_current_track(channel).await?;
                Ok(format!("Dashboard posted to {}", channel))
            }
            Self::ShowQueue => {
                bot.show_queue(channel).await?;
                Ok(format!("Queue posted to {}", channel))
            }
            Self::RequestAuth => {
                bot.request_auth(channel).await?;
                Ok(format!("Login link posted to {}", channel))
            }
            Self::Press { action_id, user } => {
                let user = user.as_deref().unwrap_or(default_user);
                let outcome = bot.handle_interaction(action_id, user).await?;
                Ok(match outcome {
                    TickOutcome::Updated(_) => "Dashboard updated".to_string(),
                    TickOutcome::NoChangeNeeded => "Dashboard already up to date".to_string(),
                    TickOutcome::RateLimited(delay) => {
                        format!("Rate limited, dashboard refresh retried in {:?}", delay)
                    }
                    TickOutcome::NoTrackPlaying => "No track is currently playing.".to_string(),
                    TickOutcome::NoActiveDevice => {
                        "No active device is currently playing anything!".to_string()
                    }
                })
            }
            Self::StopPolling => {
                bot.poller().stop().await;
                Ok("Polling stopped".to_string())
            }
            Self::Help => Ok(HELP.to_string()),
            Self::Quit => Ok("Bye".to_string()),
        }
    }
}
