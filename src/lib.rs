pub mod auth;
pub mod commands;
pub mod config;
pub mod dashboard;
/// mimir - live Spotify dashboard for Slack
pub mod models;
pub mod providers;
pub mod render;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use auth::{CredentialStore, OAuthFlow};
pub use commands::{Bot, CommandError, ConsoleCommand, Interaction};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardError, UpdateOutcome};
pub use models::{DashboardRecord, LastAction, PlaybackSnapshot, QueueItem};
pub use providers::{PlaybackSession, SessionError, SpotifyClient};
pub use sync::{Poller, SyncDriver, SyncError, TickOutcome};
pub use transport::{MessagingTransport, SlackClient, TransportError};

use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `level` applies to this crate; HTTP internals are capped at INFO.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let level: filter::LevelFilter = level.parse()?;
    let filter = filter::Targets::new()
        .with_default(filter::LevelFilter::WARN)
        .with_target("mimir", level)
        .with_target("hyper", filter::LevelFilter::INFO.min(level))
        .with_target("reqwest", filter::LevelFilter::INFO.min(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
