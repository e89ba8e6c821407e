/// Configuration management
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables override file values, e.g. `MIMIR__SLACK__BOT_TOKEN`
const ENV_PREFIX: &str = "MIMIR";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to determine config directory")]
    NoConfigDir,
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub slack: SlackConfig,
    pub spotify: SpotifyConfig,
    pub dashboard: DashboardConfig,
    pub http: HttpConfig,
    pub oauth: OAuthConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Slack workspace settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot user OAuth token (`xoxb-…`)
    pub bot_token: Option<String>,
    /// Web API base URL
    pub api_base_url: String,
    /// Channel used by the console when none is given on the command line
    pub default_channel: Option<String>,
}

/// Spotify application and Web API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Must match the redirect URI registered for the Spotify application
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    /// Space separated OAuth scopes
    pub scopes: String,
}

/// Dashboard behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Delay between background polls
    pub poll_interval_ms: u64,
    /// Number of upcoming tracks shown by the queue command
    pub queue_limit: usize,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
}

/// OAuth callback listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub listen_addr: String,
    /// Where the browser goes after a successful login
    pub success_redirect: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: "https://slack.com/api".to_string(),
            default_channel: None,
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://127.0.0.1:3000/callback".to_string(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base_url: "https://api.spotify.com/v1".to_string(),
            scopes: "user-read-playback-state user-modify-playback-state user-read-currently-playing"
                .to_string(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            queue_limit: 5,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            success_redirect: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file and the environment.
    ///
    /// With no explicit path the file is looked up in the user config directory.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_path()).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        tracing::debug!("Configuration loaded (file: {})", path.display());
        Ok(config)
    }

    /// Check the settings needed to talk to Slack and Spotify
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slack.bot_token.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Missing("slack.bot_token"));
        }
        if self.spotify.client_id.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Missing("spotify.client_id"));
        }
        if self.spotify.client_secret.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Missing("spotify.client_secret"));
        }
        Ok(())
    }

    /// Write the default configuration as a starting template
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get configuration directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("mimir");
        Ok(dir)
    }

    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mimir-{}-{}.toml", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.dashboard.poll_interval_ms, 1000);
        assert_eq!(config.dashboard.queue_limit, 5);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.slack.bot_token.is_none());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(&temp_path("missing"))).expect("defaults should load");
        assert_eq!(config.spotify.api_base_url, "https://api.spotify.com/v1");
        assert_eq!(config.oauth.listen_addr, "127.0.0.1:3000");
    }

    #[test]
    #[serial]
    fn test_load_file_overrides_defaults() {
        let path = temp_path("file");
        std::fs::write(
            &path,
            "[slack]\nbot_token = \"xoxb-test\"\n\n[dashboard]\npoll_interval_ms = 2500\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).expect("config should load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.slack.bot_token.as_deref(), Some("xoxb-test"));
        assert_eq!(config.poll_interval(), Duration::from_millis(2500));
        // Untouched values keep their defaults
        assert_eq!(config.dashboard.queue_limit, 5);
        assert_eq!(config.slack.api_base_url, "https://slack.com/api");
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let path = temp_path("env");
        std::fs::write(&path, "[spotify]\nclient_id = \"from-file\"\n").unwrap();
        std::env::set_var("MIMIR__SPOTIFY__CLIENT_ID", "from-env");

        let config = Config::load(Some(&path));
        std::env::remove_var("MIMIR__SPOTIFY__CLIENT_ID");
        let _ = std::fs::remove_file(&path);

        assert_eq!(
            config.expect("config should load").spotify.client_id.as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn test_validate_reports_first_missing_setting() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("slack.bot_token"))
        ));

        config.slack.bot_token = Some("xoxb-test".to_string());
        config.spotify.client_id = Some("id".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("spotify.client_secret"))
        ));

        config.spotify.client_secret = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_write_template_round_trips() {
        let path = temp_path("template");
        Config::write_template(&path).expect("template should be written");
        let config = Config::load(Some(&path)).expect("template should load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.dashboard.queue_limit, 5);
    }
}
