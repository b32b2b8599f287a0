//! Configuration loading.
//!
//! Loads configuration from `./config.toml` (or `$TOOLRENT_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::greeting::DEFAULT_WELCOME;
use crate::whatsapp::client::DEFAULT_BRIDGE_PORT;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bot behaviour.
    pub bot: BotConfig,
    /// Tool store location.
    pub store: StoreConfig,
    /// WhatsApp bridge connection.
    pub whatsapp: WhatsAppConfig,
    /// Liveness endpoint.
    pub health: HealthConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// If the file does not exist, returns defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path using a custom env resolver.
    ///
    /// Checks `$TOOLRENT_CONFIG_PATH` first, then `./config.toml`.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("TOOLRENT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("TOOLRENT_DB_PATH") {
            self.store.db_path = PathBuf::from(v);
        }
        if let Some(v) = env("TOOLRENT_BRIDGE_URL") {
            self.whatsapp.bridge_url = v;
        }
        if let Some(v) = env("TOOLRENT_LOGS_DIR") {
            self.logging.logs_dir = PathBuf::from(v);
        }
        if let Some(v) = env("TOOLRENT_LOG_LEVEL") {
            self.logging.level = v;
        }

        // Hosting platforms hand the listen port over as `PORT`.
        if let Some(v) = env("PORT") {
            match v.parse() {
                Ok(port) => self.health.port = port,
                Err(_) => tracing::warn!(var = "PORT", value = %v, "ignoring invalid env override"),
            }
        }

        if let Some(v) = env("TOOLRENT_WELCOME") {
            match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.bot.welcome_enabled = true,
                "0" | "false" | "no" | "off" => self.bot.welcome_enabled = false,
                _ => tracing::warn!(
                    var = "TOOLRENT_WELCOME",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Parse a TOML string into config.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

// ── Bot config ──────────────────────────────────────────────────

/// Bot behaviour settings (`[bot]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Greet first-time senders.
    pub welcome_enabled: bool,
    /// Welcome text.
    pub welcome_message: String,
    /// Maximum number of remembered senders.
    pub known_senders_capacity: usize,
    /// Seconds before a remembered sender is greeted again.
    pub known_senders_ttl_secs: u64,
    /// Buffer size of the event channel.
    pub channel_buffer_size: usize,
    /// Seconds to wait for in-flight replies on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl BotConfig {
    /// Known-sender capacity, at least one.
    pub fn known_senders_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.known_senders_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Known-sender TTL.
    pub fn known_senders_ttl(&self) -> Duration {
        Duration::from_secs(self.known_senders_ttl_secs)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            welcome_enabled: true,
            welcome_message: DEFAULT_WELCOME.to_owned(),
            known_senders_capacity: 10_000,
            known_senders_ttl_secs: 7 * 24 * 60 * 60,
            channel_buffer_size: 100,
            shutdown_timeout_secs: 30,
        }
    }
}

// ── Store config ────────────────────────────────────────────────

/// Tool store settings (`[store]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/tools.db"),
        }
    }
}

// ── WhatsApp config ─────────────────────────────────────────────

/// WhatsApp bridge settings (`[whatsapp]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Base URL of the bridge sidecar.
    pub bridge_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            bridge_url: format!("http://127.0.0.1:{DEFAULT_BRIDGE_PORT}"),
        }
    }
}

// ── Health config ───────────────────────────────────────────────

/// Liveness endpoint settings (`[health]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Serve the endpoint at all.
    pub enabled: bool,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl HealthConfig {
    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid health address {}:{}", self.host, self.port))
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Log output settings (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rotated JSON logs.
    pub logs_dir: PathBuf,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            level: "info".to_owned(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
