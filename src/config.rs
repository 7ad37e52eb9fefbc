use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::ReplyScope;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

/// Event store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

/// Graph aggregation and rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Directory rendered HTML graphs are written to and served from.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Whether reply targets resolve against every stored message or only
    /// the ones from the server being aggregated.
    #[serde(default)]
    pub reply_scope: ReplyScope,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            reply_scope: ReplyScope::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Discord listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Name of the environment variable holding the bot token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_http_port() -> u16 {
    5000
}

fn default_allowed_origins() -> Vec<String> {
    // Empty means any origin; the browser client runs on a different port in dev
    vec![]
}

fn default_token_env() -> String {
    "DISCORD_BOT_TOKEN".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in REPLYGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("REPLYGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml(&config_str)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.store.db_path.as_os_str().is_empty() {
            anyhow::bail!("store.db_path must not be empty");
        }

        if self.graph.output_dir.as_os_str().is_empty() {
            anyhow::bail!("graph.output_dir must not be empty");
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        if self.discord.token_env.trim().is_empty() {
            anyhow::bail!("discord.token_env must name an environment variable");
        }

        Ok(())
    }

    /// Read the Discord bot token from the configured environment variable.
    ///
    /// Only the listener needs the token, so this is checked lazily rather
    /// than during `validate`.
    pub fn discord_token(&self) -> Result<String> {
        let token = std::env::var(&self.discord.token_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your Discord bot token.",
                self.discord.token_env
            )
        })?;

        if token.trim().is_empty() {
            anyhow::bail!("Environment variable {} is empty", self.discord.token_env);
        }

        Ok(token)
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    /// Get migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.store.migrations_dir
    }

    /// Get the directory rendered graphs live in
    pub fn output_dir(&self) -> &Path {
        &self.graph.output_dir
    }
}
