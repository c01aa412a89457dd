//! Server configuration
//!
//! Loaded from a YAML file, then overridden from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file path
pub const CONFIG_PATH_DEFAULT: &str = "config.yml";

/// Default HTTP port
pub const SERVER_PORT_DEFAULT: u16 = 6666;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Serve from the in-memory store, ignoring `postgres`
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// `host:port`
    pub db_url: String,
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<InitialData>,
}

/// Random entities generated into the store at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialData {
    pub count: usize,
    pub size: usize,
}

fn default_server_port() -> u16 {
    SERVER_PORT_DEFAULT
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self::default_for(true)
    }
}

impl Config {
    /// Configuration written by `init-config`
    pub fn default_for(debug: bool) -> Self {
        Self {
            debug,
            server_port: SERVER_PORT_DEFAULT,
            postgres: Some(PostgresConfig {
                db_url: "localhost:5432".to_string(),
                database: "entities".to_string(),
                username: "entities".to_string(),
                password: String::new(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout_secs(),
                initial_data: None,
            }),
        }
    }

    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are used instead.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        info!(
            "Config loaded: debug={}, port={}",
            config.debug, config.server_port
        );
        Ok(config)
    }

    /// Write configuration as YAML
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        info!("Config written to {}", path.display());
        Ok(())
    }

    /// Apply `EXQUISITE_*` overrides, reading variables through `var`.
    fn apply_env_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(debug) = var("EXQUISITE_DEBUG") {
            self.debug = parse_bool(&debug)
                .with_context(|| format!("Invalid EXQUISITE_DEBUG value: {}", debug))?;
        }

        if let Some(port) = var("EXQUISITE_SERVER_PORT") {
            self.server_port = port
                .parse()
                .with_context(|| format!("Invalid EXQUISITE_SERVER_PORT value: {}", port))?;
        }

        if let Some(password) = var("EXQUISITE_PG_PASSWORD") {
            match self.postgres.as_mut() {
                Some(pg) => pg.password = password,
                None => warn!("EXQUISITE_PG_PASSWORD set but no postgres section configured"),
            }
        }

        Ok(())
    }

    /// Postgres settings to connect with, or `None` to serve from memory
    pub fn relational(&self) -> Option<&PostgresConfig> {
        if self.debug {
            return None;
        }
        if self.postgres.is_none() {
            warn!("Debug mode is disabled but no postgres configuration is given");
        }
        self.postgres.as_ref()
    }

    /// Seeding settings, if any
    pub fn initial_data(&self) -> Option<InitialData> {
        self.postgres.as_ref().and_then(|pg| pg.initial_data)
    }
}

impl PostgresConfig {
    /// Split `db_url` into host and port
    pub fn host_port(&self) -> Result<(String, u16)> {
        let (host, port) = self
            .db_url
            .rsplit_once(':')
            .with_context(|| format!("db_url must be host:port, got {}", self.db_url))?;
        if host.is_empty() {
            anyhow::bail!("db_url has an empty host: {}", self.db_url);
        }
        let port = port
            .parse()
            .with_context(|| format!("Invalid port in db_url: {}", self.db_url))?;
        Ok((host.to_string(), port))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {}", other),
    }
}
