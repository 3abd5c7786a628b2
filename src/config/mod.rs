//! Configuration loading.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file
//! (`pagewatch.toml` in the current directory or `--config <path>`), then
//! environment variables (including anything loaded from `.env`).
//! Relative paths resolve against the config file's directory, or the
//! current directory with `--cwd`.

mod settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm::LlmConfig;
use crate::notify::SmtpConfig;

pub use settings::{Settings, DEFAULT_SNAPSHOT_DIR, DEFAULT_STATE_FILE, DEFAULT_URLS_FILE};

/// Config filename discovered in the current directory.
pub const CONFIG_FILENAME: &str = "pagewatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Watch-list path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<String>,
    /// State file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
    /// Snapshot directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<String>,
    /// User agent string ("impersonate" for a browser UA).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Email delivery.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// LLM change summaries.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Parse a TOML config file.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;

        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars: `PAGEWATCH_URLS`, `PAGEWATCH_STATE_FILE`,
    /// `PAGEWATCH_SNAPSHOT_DIR`, `PAGEWATCH_REQUEST_TIMEOUT`,
    /// `PAGEWATCH_USER_AGENT`, plus those read by [`SmtpConfig`] and
    /// [`LlmConfig`].
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(urls) = non_empty_env("PAGEWATCH_URLS") {
            self.urls = Some(urls);
        }
        if let Some(state_file) = non_empty_env("PAGEWATCH_STATE_FILE") {
            self.state_file = Some(state_file);
        }
        if let Some(dir) = non_empty_env("PAGEWATCH_SNAPSHOT_DIR") {
            self.snapshot_dir = Some(dir);
        }
        if let Some(timeout) = non_empty_env("PAGEWATCH_REQUEST_TIMEOUT").and_then(|t| t.parse().ok()) {
            self.request_timeout = Some(timeout);
        }
        if let Some(ua) = non_empty_env("PAGEWATCH_USER_AGENT") {
            self.user_agent = Some(ua);
        }
        self.smtp = self.smtp.with_env_overrides();
        self.llm = self.llm.with_env_overrides();
        self
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = Path::new(path_str);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref urls) = self.urls {
            settings.urls_file = self.resolve_path(urls, base_dir);
        }
        if let Some(ref state_file) = self.state_file {
            settings.state_file = self.resolve_path(state_file, base_dir);
        }
        if let Some(ref dir) = self.snapshot_dir {
            settings.snapshot_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        settings.config_path = self.source_path.clone();
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides discovery; must exist).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

async fn load_config(options: &LoadOptions, cwd: &Path) -> Result<Config, ConfigError> {
    if let Some(ref path) = options.config_path {
        return Config::load_from_path(path).await;
    }

    let discovered = cwd.join(CONFIG_FILENAME);
    if discovered.is_file() {
        debug!("Using config file {}", discovered.display());
        Config::load_from_path(&discovered).await
    } else {
        debug!("No {} found, using defaults", CONFIG_FILENAME);
        Ok(Config::default())
    }
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&options, &cwd).await?.with_env_overrides();

    let base_dir = if options.use_cwd {
        cwd
    } else {
        config.base_dir().unwrap_or(cwd)
    };

    let mut settings = Settings::with_base_dir(&base_dir);
    config.apply_to_settings(&mut settings, &base_dir);
    debug!(
        "Settings: urls={}, state={}, snapshots={}",
        settings.urls_file.display(),
        settings.state_file.display(),
        settings.snapshot_dir.display()
    );

    Ok((settings, config))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            urls = "watch/urls.txt"
            state_file = "/var/lib/pagewatch/state.json"
            request_timeout = 10

            [smtp]
            server = "smtp.example.test"
            recipients = "a@example.test, b@example.test"

            [llm]
            provider = "ollama"
            "#,
        )
        .unwrap();

        assert_eq!(config.urls.as_deref(), Some("watch/urls.txt"));
        assert_eq!(config.request_timeout, Some(10));
        assert_eq!(config.smtp.server.as_deref(), Some("smtp.example.test"));
        assert_eq!(config.smtp.recipients.len(), 2);
        assert_eq!(config.llm.provider, crate::llm::LlmProvider::Ollama);
    }

    #[test]
    fn test_apply_resolves_relative_paths() {
        let config = Config {
            urls: Some("watch/urls.txt".to_string()),
            state_file: Some("/abs/state.json".to_string()),
            ..Config::default()
        };
        let base = Path::new("/etc/pagewatch");
        let mut settings = Settings::with_base_dir(base);
        config.apply_to_settings(&mut settings, base);

        assert_eq!(
            settings.urls_file,
            PathBuf::from("/etc/pagewatch/watch/urls.txt")
        );
        assert_eq!(settings.state_file, PathBuf::from("/abs/state.json"));
        assert_eq!(
            settings.snapshot_dir,
            PathBuf::from("/etc/pagewatch/snapshots")
        );
    }

    #[tokio::test]
    async fn test_load_from_path_sets_base_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "snapshot_dir = \"snaps\"\n").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));
        assert_eq!(config.snapshot_dir.as_deref(), Some("snaps"));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_error() {
        let dir = tempdir().unwrap();
        let options = LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            use_cwd: false,
        };
        let err = load_config(&options, dir.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_invalid_config_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pagewatch.toml");
        std::fs::write(&path, "request_timeout = \"soon\"\n").unwrap();

        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_discovers_config_in_cwd() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "urls = \"list.txt\"\n").unwrap();

        let config = load_config(&LoadOptions::default(), dir.path()).await.unwrap();
        assert_eq!(config.urls.as_deref(), Some("list.txt"));

        let empty = tempdir().unwrap();
        let config = load_config(&LoadOptions::default(), empty.path()).await.unwrap();
        assert_eq!(config, Config::default());
    }
}
