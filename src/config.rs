//! Configuration management for Formcraft
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{FormcraftError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the upstream API credential
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Main configuration structure for Formcraft
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// History store settings
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Upstream completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the upstream completion API
    ///
    /// Usually supplied through `OPENROUTER_API_KEY` rather than the file.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (useful for tests and local mocks)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier sent upstream
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Value of the `HTTP-Referer` attribution header
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Value of the `X-Title` attribution header
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "anthropic/claude-4-sonnet-20250522".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    120
}

fn default_referer() -> String {
    "http://localhost:3000".to_string()
}

fn default_title() -> String {
    "Formily Design".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Externally visible base URL, used to build blob URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Maximum accepted request body size (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_base_url: default_public_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Storage location configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Root directory for databases and blobs
    ///
    /// Falls back to the platform data directory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the data directory, falling back to the platform default
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::Config` if no data directory can be determined
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let proj_dirs = ProjectDirs::from("com", "formcraft", "formcraft").ok_or_else(|| {
            FormcraftError::Config("Could not determine data directory".to_string())
        })?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Path of the remote history database
    pub fn remote_db_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join("history.sled"))
    }

    /// Path of the local history database used by the CLI
    pub fn local_db_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join("local.sled"))
    }

    /// Root directory of the blob store
    pub fn blob_dir(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join("blobs"))
    }
}

/// History store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of local history items retained
    #[serde(default = "default_local_cap")]
    pub local_cap: usize,

    /// Storage key holding the local history array
    #[serde(default = "default_local_key")]
    pub local_key: String,

    /// Page size used when a list request carries no limit
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Upper bound on requested page sizes
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_local_cap() -> usize {
    50
}

fn default_local_key() -> String {
    "formcraft_history".to_string()
}

fn default_page_size() -> usize {
    12
}

fn default_max_page_size() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            local_cap: default_local_cap(),
            local_key: default_local_key(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FormcraftError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| FormcraftError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            if !api_key.trim().is_empty() {
                self.provider.api_key = Some(api_key);
            }
        }

        if let Ok(model) = std::env::var("FORMCRAFT_MODEL") {
            self.provider.model = model;
        }

        if let Ok(api_base) = std::env::var("FORMCRAFT_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(bind) = std::env::var("FORMCRAFT_BIND") {
            self.server.bind = bind;
        }

        if let Ok(public_url) = std::env::var("FORMCRAFT_PUBLIC_URL") {
            self.server.public_base_url = public_url;
        }

        if let Ok(data_dir) = std::env::var("FORMCRAFT_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(data_dir));
        }

        if let Ok(timeout) = std::env::var("FORMCRAFT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid FORMCRAFT_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(data_dir) = &cli.data_dir {
            self.storage.data_dir = Some(data_dir.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// The API key is deliberately not checked here; only the generation
    /// endpoint needs it and reports its absence per request.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(FormcraftError::Config("provider.model cannot be empty".to_string()).into());
        }

        url::Url::parse(&self.provider.api_base).map_err(|e| {
            FormcraftError::Config(format!(
                "provider.api_base is not a valid URL ({}): {}",
                self.provider.api_base, e
            ))
        })?;

        url::Url::parse(&self.server.public_base_url).map_err(|e| {
            FormcraftError::Config(format!(
                "server.public_base_url is not a valid URL ({}): {}",
                self.server.public_base_url, e
            ))
        })?;

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(FormcraftError::Config(
                "provider.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.provider.max_tokens == 0 {
            return Err(
                FormcraftError::Config("provider.max_tokens must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.provider.timeout_seconds == 0 {
            return Err(FormcraftError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.server.max_upload_bytes == 0 {
            return Err(FormcraftError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.history.local_cap == 0 {
            return Err(
                FormcraftError::Config("history.local_cap must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.history.local_key.trim().is_empty() {
            return Err(
                FormcraftError::Config("history.local_key cannot be empty".to_string()).into(),
            );
        }

        if self.history.default_page_size == 0 || self.history.max_page_size == 0 {
            return Err(FormcraftError::Config(
                "history page sizes must be greater than 0".to_string(),
            )
            .into());
        }

        if self.history.default_page_size > self.history.max_page_size {
            return Err(FormcraftError::Config(format!(
                "history.default_page_size ({}) exceeds history.max_page_size ({})",
                self.history.default_page_size, self.history.max_page_size
            ))
            .into());
        }

        Ok(())
    }
}
