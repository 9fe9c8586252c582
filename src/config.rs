use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::bitbucket::error::API_TOKEN_URL;
use crate::bitbucket::{ClientSettings, DEFAULT_BASE_URL};
use crate::review::BotPattern;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".bitbucket-mcp.toml";

pub const ENV_EMAIL: &str = "BITBUCKET_EMAIL";
pub const ENV_API_TOKEN: &str = "BITBUCKET_API_TOKEN";
pub const ENV_WORKSPACE: &str = "BITBUCKET_WORKSPACE";
pub const ENV_BASE_URL: &str = "BITBUCKET_API_BASE_URL";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{}", missing_credentials_message(.missing))]
    MissingCredentials { missing: Vec<&'static str> },
}

fn missing_credentials_message(missing: &[&'static str]) -> String {
    let mut lines = vec![format!(
        "Missing credentials ({}). Set these environment variables:",
        missing.join(", ")
    )];
    lines.push(format!("  {}    - Your Atlassian account email", ENV_EMAIL));
    lines.push(format!("  {} - Your Bitbucket API token", ENV_API_TOKEN));
    lines.push(String::new());
    lines.push(format!("Create an API token at: {}", API_TOKEN_URL));
    lines.join("\n")
}

/// Top-level configuration loaded from .bitbucket-mcp.toml.
///
/// All fields are optional. Values absent from the file fall back to the
/// `BITBUCKET_*` / `LOG_LEVEL` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketConfig {
    /// Atlassian account email used for Basic auth
    pub email: Option<String>,
    pub api_token: Option<String>,
    /// Workspace used when a tool call omits one
    pub workspace: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewConfig {
    /// Replaces the built-in bot author patterns when set
    pub bot_patterns: Option<Vec<BotPattern>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// One of debug, info, warn, error
    pub level: Option<String>,
}

/// Account identifier and API token for Basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub api_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Load a `.env` file from the working directory or one of its parents into
/// the process environment. Variables that are already set are not replaced.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

impl Config {
    /// Load `path`, or .bitbucket-mcp.toml in the current directory when it
    /// exists, then fill unset values from the environment.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None if default_path.exists() => Self::load_from(default_path)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset values from `lookup`. File values take precedence.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.as_deref().map_or(true, str::is_empty) {
                *slot = lookup(key).filter(|v| !v.is_empty());
            }
        };
        fill(&mut self.bitbucket.email, ENV_EMAIL);
        fill(&mut self.bitbucket.api_token, ENV_API_TOKEN);
        fill(&mut self.bitbucket.workspace, ENV_WORKSPACE);
        fill(&mut self.bitbucket.base_url, ENV_BASE_URL);
        fill(&mut self.log.level, ENV_LOG_LEVEL);
    }

    /// Both credentials, or the list of missing variables.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let mut missing = Vec::new();
        if self.bitbucket.email.is_none() {
            missing.push(ENV_EMAIL);
        }
        if self.bitbucket.api_token.is_none() {
            missing.push(ENV_API_TOKEN);
        }
        match (&self.bitbucket.email, &self.bitbucket.api_token) {
            (Some(email), Some(api_token)) => Ok(Credentials {
                email: email.clone(),
                api_token: api_token.clone(),
            }),
            _ => Err(ConfigError::MissingCredentials { missing }),
        }
    }

    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        Ok(ClientSettings {
            credentials: self.credentials()?,
            default_workspace: self.bitbucket.workspace.clone(),
            base_url: self
                .bitbucket
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or("info")
    }
}
