/// Main entry point for the mimir bot
use anyhow::Context;
use clap::Parser;
use mimir::auth::start_oauth_server;
use mimir::commands::console::ParseError;
use mimir::{Bot, Config, ConsoleCommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "mimir",
    version,
    about = "Keeps a live Spotify now-playing dashboard in a Slack channel",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the bot with an operator console on stdin
    Run {
        /// Slack channel for dashboard and notices
        #[arg(long)]
        channel: Option<String>,
    },

    /// Write a configuration template
    InitConfig {
        /// Where to write it (defaults to the user config directory)
        path: Option<PathBuf>,
    },

    /// Print the link users open to connect Spotify
    AuthUrl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::InitConfig { path }) = &args.command {
        let path = match path {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        Config::write_template(&path)?;
        println!("Configuration template written to {}", path.display());
        return Ok(());
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let level = args.log_level.as_deref().unwrap_or(&config.general.log_level);
    mimir::init_logging(level)?;

    match args.command {
        Some(Command::AuthUrl) => {
            println!("http://{}/login", config.oauth.listen_addr);
            Ok(())
        }
        Some(Command::Run { channel }) => run(config, channel).await,
        Some(Command::InitConfig { .. }) => Ok(()),
        None => run(config, None).await,
    }
}

async fn run(config: Config, channel: Option<String>) -> anyhow::Result<()> {
    config.validate()?;
    let channel = channel
        .or_else(|| config.slack.default_channel.clone())
        .context("No channel given; pass --channel or set slack.default_channel")?;

    info!("Starting mimir v{}", env!("CARGO_PKG_VERSION"));
    let bot = Arc::new(Bot::from_config(&config)?);

    let listener = TcpListener::bind(&config.oauth.listen_addr)
        .await
        .with_context(|| format!("Failed to bind OAuth listener on {}", config.oauth.listen_addr))?;
    let oauth_server = tokio::spawn(start_oauth_server(
        listener,
        bot.oauth().clone(),
        config.oauth.success_redirect.clone(),
    ));
    info!(
        "Connect Spotify at http://{}/login",
        config.oauth.listen_addr
    );

    let default_user = std::env::var("USER").unwrap_or_else(|_| "operator".to_string());
    println!("{}", mimir::commands::console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // stdin closed; keep serving until Ctrl-C
                        let _ = tokio::signal::ctrl_c().await;
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read console input: {}", e);
                        break;
                    }
                };

                match ConsoleCommand::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        let bot = bot.clone();
                        let channel = channel.clone();
                        let user = default_user.clone();
                        tokio::spawn(async move {
                            match command.dispatch(&bot, &channel, &user).await {
                                Ok(message) => println!("{}", message),
                                Err(e) => warn!("Command failed: {}", e),
                            }
                        });
                    }
                    Err(ParseError(word)) => println!("Unknown command: {} (try `help`)", word),
                }
            }
        }
    }

    bot.shutdown().await;
    oauth_server.abort();
    info!("mimir stopped");
    Ok(())
}
