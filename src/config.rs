use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for greprepos
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub endpoints and transport settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// What the audit looks for in each repository
    #[serde(default)]
    pub audit: AuditConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Web URL, used to build links to organization default files
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// REST API root
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Audit configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuditConfig {
    /// Repository holding the organization default files
    #[serde(default = "default_defaults_repo")]
    pub defaults_repo: String,

    #[serde(default = "default_contributing_file")]
    pub contributing_file: String,

    #[serde(default = "default_code_of_conduct_file")]
    pub code_of_conduct_file: String,

    /// File explaining why a repository is private
    #[serde(default = "default_why_private_file")]
    pub why_private_file: String,

    /// Travis CI config; its presence marks repositories still to migrate
    #[serde(default = "default_travis_config_file")]
    pub travis_config_file: String,

    #[serde(default = "default_renovate_user")]
    pub renovate_user: String,

    /// Seconds added to the rate-limit reset time before retrying
    #[serde(default = "default_rate_limit_margin")]
    pub rate_limit_margin_secs: u64,

    /// Bot that opens standards-compliance PRs across the organization
    pub bot_user: Option<String>,
}

/// Output configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_csvfile")]
    pub csvfile: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

// Default value functions
fn default_base_url() -> String {
    "https://github.com".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_defaults_repo() -> String {
    ".github".to_string()
}
fn default_contributing_file() -> String {
    "CONTRIBUTING.md".to_string()
}
fn default_code_of_conduct_file() -> String {
    "CODE_OF_CONDUCT.md".to_string()
}
fn default_why_private_file() -> String {
    "WHY_PRIVATE.md".to_string()
}
fn default_travis_config_file() -> String {
    ".travis.yml".to_string()
}
fn default_renovate_user() -> String {
    "renovate[bot]".to_string()
}
fn default_rate_limit_margin() -> u64 {
    10
}
fn default_csvfile() -> String {
    "github_repo_data.csv".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            defaults_repo: default_defaults_repo(),
            contributing_file: default_contributing_file(),
            code_of_conduct_file: default_code_of_conduct_file(),
            why_private_file: default_why_private_file(),
            travis_config_file: default_travis_config_file(),
            renovate_user: default_renovate_user(),
            rate_limit_margin_secs: default_rate_limit_margin(),
            bot_user: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csvfile: default_csvfile(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("greprepos").join("config.yml"))
    }

    /// Expand `~` and environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.output.csvfile = shellexpand::full(&self.output.csvfile)
            .context("Failed to expand csvfile path")?
            .into_owned();

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.github.request_timeout_secs)
    }

    pub fn rate_limit_margin(&self) -> Duration {
        Duration::from_secs(self.audit.rate_limit_margin_secs)
    }
}
