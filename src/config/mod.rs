//! Configuration management for vmail.
//!
//! Configuration is read from `~/.config/vmail/config.toml` (or the path
//! given with `--config`). If the file doesn't exist, a default
//! configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fetcher::http_fetcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::ingest::{DeliveryOptions, DEFAULT_PRUNE_LIMIT, DEFAULT_WORKERS};
use crate::mail::Address;
use crate::maildir::Owner;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory; defaults to `<data_dir>/vmail`.
    pub home: Option<PathBuf>,
    /// SQLite database; defaults to `<home>/vmail.sqlite`.
    pub database: Option<PathBuf>,
    /// Mailbox root; defaults to `<home>/feeds`.
    pub feeds_dir: Option<PathBuf>,
    /// Owner applied to created mailboxes.
    pub owner: Option<Owner>,
    pub delivery: DeliveryConfig,
    pub fetch: FetchConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub sender: String,
    pub domain: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            sender: "vmail <vmail@localhost>".to_string(),
            domain: "localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub workers: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub prune_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            prune_limit: DEFAULT_PRUNE_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `path`, creating a commented default there
    /// when it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/vmail/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("vmail").join("config.toml"))
    }

    pub fn home_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("vmail"))
            }
        }
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(self.home_dir()?.join("vmail.sqlite")),
        }
    }

    pub fn feeds_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.feeds_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(self.home_dir()?.join("feeds")),
        }
    }

    pub fn delivery_options(&self) -> Result<DeliveryOptions, ConfigError> {
        let sender = Address::parse(&self.delivery.sender)
            .map_err(|_| ConfigError::Invalid(format!("delivery.sender: {:?}", self.delivery.sender)))?;

        let domain = self.delivery.domain.trim();
        if domain.is_empty() || domain.contains(['@', ' ', '<', '>']) {
            return Err(ConfigError::Invalid(format!(
                "delivery.domain: {:?}",
                self.delivery.domain
            )));
        }

        Ok(DeliveryOptions {
            sender,
            domain: domain.to_string(),
            prune_limit: self.history.prune_limit,
        })
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# vmail configuration

# Base directory for the database and mailboxes
# (default: the platform data directory, e.g. ~/.local/share/vmail)
# home = "/var/vmail"

# SQLite database (default: <home>/vmail.sqlite)
# database = "/var/vmail/vmail.sqlite"

# One maildir per feed is created below this directory (default: <home>/feeds)
# feeds_dir = "/var/vmail/feeds"

# Numeric owner for created mailboxes, applied when running privileged
# owner = { uid = 5000, gid = 5000 }

[delivery]
# From address of delivered messages
sender = "vmail <vmail@localhost>"

# Messages for feed NAME are addressed to NAME@<domain>
domain = "localhost"

[fetch]
# Request timeout in seconds
timeout_secs = 30

# Feeds fetched in parallel
workers = 4

# user_agent = "vmail"

[history]
# Delivered entries remembered per feed
prune_limit = 1000
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration value {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let config: Config = toml::from_str(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert!(config.home.is_none());
        assert!(config.owner.is_none());
        assert_eq!(config.delivery.sender, "vmail <vmail@localhost>");
        assert_eq!(config.delivery.domain, "localhost");
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.workers, 4);
        assert_eq!(config.history.prune_limit, 1000);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
home = "/srv/vmail"
owner = { uid = 5000, gid = 6000 }

[history]
prune_limit = 50
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.home_dir().unwrap(), PathBuf::from("/srv/vmail"));
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/srv/vmail/vmail.sqlite")
        );
        assert_eq!(config.feeds_path().unwrap(), PathBuf::from("/srv/vmail/feeds"));
        assert_eq!(config.owner, Some(Owner { uid: 5000, gid: 6000 }));
        assert_eq!(config.history.prune_limit, 50);
        // Default value
        assert_eq!(config.fetch.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_explicit_paths_override_home() {
        let content = r##"
home = "/srv/vmail"
database = "/tmp/other.sqlite"
feeds_dir = "/var/mail/feeds"
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/other.sqlite"));
        assert_eq!(config.feeds_path().unwrap(), PathBuf::from("/var/mail/feeds"));
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
        assert_eq!(config.history.prune_limit, DEFAULT_PRUNE_LIMIT);
    }

    #[test]
    fn test_delivery_options() {
        let config = Config::default();
        let options = config.delivery_options().unwrap();
        assert_eq!(options.sender, Address::new("vmail", "vmail@localhost"));
        assert_eq!(options.domain, "localhost");
        assert_eq!(options.prune_limit, DEFAULT_PRUNE_LIMIT);
    }

    #[test]
    fn test_invalid_delivery_values() {
        let mut config = Config::default();
        config.delivery.sender = "not an address".into();
        assert!(matches!(config.delivery_options(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.delivery.domain = "user@host".into();
        assert!(matches!(config.delivery_options(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.fetch.workers, DEFAULT_WORKERS);
        assert!(path.exists());

        // The written file loads back.
        let again = Config::load_from(&path).unwrap();
        assert_eq!(again.delivery.domain, "localhost");
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\nworkers = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
