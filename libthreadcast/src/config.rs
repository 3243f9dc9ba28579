//! Configuration management for Threadcast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const CONFIG_ENV: &str = "THREADCAST_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub thread: ThreadConfig,
    pub mastodon: Option<MastodonConfig>,
    #[serde(default)]
    pub commit: CommitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    pub root: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: "tweets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    pub path: String,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            path: "tweet-statistics.csv".to_string(),
        }
    }
}

/// How the due bundle is chosen when no explicit name is given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Pure function of the current instant and catalog size
    #[default]
    Rotation,
    /// Never-published bundles first, then the one published longest ago
    LeastRecent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Rotation period in humantime syntax, e.g. "7days" or "1week"
    pub period: String,
    #[serde(default)]
    pub strategy: SelectionStrategy,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            period: "7days".to_string(),
            strategy: SelectionStrategy::Rotation,
        }
    }
}

impl RotationConfig {
    /// Parse the configured period; zero-length periods are rejected
    pub fn period_duration(&self) -> Result<Duration> {
        let period = humantime::parse_duration(&self.period).map_err(|e| {
            ConfigError::InvalidValue {
                field: "rotation.period".to_string(),
                reason: format!("'{}': {}", self.period, e),
            }
        })?;

        if period.as_secs() == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rotation.period".to_string(),
                reason: "must be at least one second".to_string(),
            }
            .into());
        }

        Ok(period)
    }
}

/// Whether a run starts a new thread or continues the last open one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadMode {
    #[default]
    Fresh,
    Continue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadConfig {
    #[serde(default)]
    pub mode: ThreadMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    pub instance: String,
}

/// Committing and pushing the statistics file is on unless a config turns it off
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    pub enabled: bool,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub push: bool,
    pub branch: Option<String>,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            message: "Update statistics".to_string(),
            author_name: "threadcast".to_string(),
            author_email: "threadcast@localhost".to_string(),
            push: true,
            branch: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields [`Config::default_config`], so a run from a
    /// content repository needs no config file at all.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.rotation.period_duration()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            content: ContentConfig::default(),
            statistics: StatisticsConfig::default(),
            rotation: RotationConfig::default(),
            thread: ThreadConfig::default(),
            mastodon: None,
            commit: CommitConfig::default(),
        }
    }

    pub fn content_root(&self) -> PathBuf {
        expand_path(&self.content.root)
    }

    pub fn statistics_path(&self) -> PathBuf {
        expand_path(&self.statistics.path)
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("threadcast").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
[content]
root = "posts"

[statistics]
path = "stats.csv"

[rotation]
period = "1day"
strategy = "least_recent"

[thread]
mode = "continue"

[mastodon]
instance = "https://example.social"

[commit]
enabled = true
message = "Refresh counters"
author_name = "Bot"
author_email = "bot@example.com"
push = true
branch = "main"
"#,
        )
        .unwrap();

        assert_eq!(config.content.root, "posts");
        assert_eq!(config.statistics.path, "stats.csv");
        assert_eq!(config.rotation.strategy, SelectionStrategy::LeastRecent);
        assert_eq!(
            config.rotation.period_duration().unwrap(),
            Duration::from_secs(86_400)
        );
        assert_eq!(config.thread.mode, ThreadMode::Continue);
        assert_eq!(config.mastodon.unwrap().instance, "https://example.social");
        assert!(config.commit.enabled);
        assert_eq!(config.commit.branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.content.root, "tweets");
        assert_eq!(config.statistics.path, "tweet-statistics.csv");
        assert_eq!(config.rotation.strategy, SelectionStrategy::Rotation);
        assert_eq!(
            config.rotation.period_duration().unwrap(),
            Duration::from_secs(7 * 86_400)
        );
        assert_eq!(config.thread.mode, ThreadMode::Fresh);
        assert!(config.mastodon.is_none());
        assert!(config.commit.enabled);
        assert!(config.commit.push);
    }

    #[test]
    fn test_commit_section_can_opt_out() {
        let config = Config::parse("[commit]\nenabled = false\n").unwrap();

        assert!(!config.commit.enabled);
        assert!(config.commit.push);
        assert_eq!(config.commit.message, "Update statistics");
    }

    #[test]
    fn test_invalid_period_rejected() {
        let result = Config::parse("[rotation]\nperiod = \"fortnightly\"\n");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("rotation.period"));
    }

    #[test]
    fn test_zero_period_rejected() {
        let rotation = RotationConfig {
            period: "0s".to_string(),
            strategy: SelectionStrategy::Rotation,
        };
        assert!(rotation.period_duration().is_err());
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = Config::parse("[rotation]\nperiod = \"7days\"\nstrategy = \"random\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[content]\nroot = \"announcements\"\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.content_root(), PathBuf::from("announcements"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_from_env() {
        std::env::set_var(CONFIG_ENV, "/tmp/threadcast-test/config.toml");
        let path = resolve_config_path().unwrap();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(path, PathBuf::from("/tmp/threadcast-test/config.toml"));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        std::env::set_var(CONFIG_ENV, dir.path().join("absent.toml"));
        let config = Config::load().unwrap();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(config.statistics.path, "tweet-statistics.csv");
    }
}
