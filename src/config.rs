//! Configuration management for the topic poll server
//!
//! Loaded once at startup from `config.toml` with `POLL_*` environment
//! overrides.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::client::SessionTiming;
use crate::poll::{TopicCatalog, TopicId};

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK (Environment Override Supported) ═══
    /// IP address to bind the listener
    pub bind_address: String,

    /// Listener port
    pub port: u16,

    // ═══ SESSION TIMING ═══
    /// Seconds before an unanswered pair is replaced; sent to every client
    /// in the handshake
    pub relapse_period_secs: u32,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks without any inbound message before a client is dropped
    #[serde(default = "default_idle_timeout_ticks")]
    pub idle_timeout_ticks: u32,

    /// Interval of the tally log line, 0 disables it
    #[serde(default)]
    pub stats_interval_secs: u64,

    // ═══ POLL (TOML Only) ═══
    pub topics: Vec<TopicEntry>,
}

/// One `[[topics]]` table
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub id: TopicId,
    pub label: String,
}

fn default_tick_interval_ms() -> u64 {
    10
}

fn default_idle_timeout_ticks() -> u32 {
    100
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Packaged layout first, then the working directory
        let config_paths = ["topic-poll-server/config", "config"];

        let mut last_error = None;

        for config_path in &config_paths {
            match Config::builder()
                .add_source(File::with_name(config_path))
                .add_source(Environment::with_prefix("POLL").separator("_"))
                .build()
            {
                Ok(settings) => {
                    let config: ServerConfig = settings.try_deserialize()?;
                    config.validate()?;
                    return Ok(config);
                }
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            config::ConfigError::Message(format!(
                "No config.toml found. Tried: {config_paths:?}"
            ))
        }))
    }

    /// Parse a configuration from TOML text, without environment overrides
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        let config: ServerConfig = Config::builder()
            .add_source(File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.relapse_period_secs == 0 {
            return Err(config::ConfigError::Message(
                "relapse_period_secs must be greater than 0".into(),
            ));
        }

        if i32::try_from(self.relapse_period_secs).is_err() {
            return Err(config::ConfigError::Message(
                "relapse_period_secs does not fit the wire int".into(),
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "tick_interval_ms must be greater than 0".into(),
            ));
        }

        if self.idle_timeout_ticks == 0 {
            return Err(config::ConfigError::Message(
                "idle_timeout_ticks must be greater than 0".into(),
            ));
        }

        // Topic rules live in the catalog; checked here so a bad file fails at load.
        TopicCatalog::new(self.topic_entries())
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(())
    }

    /// Get bind address and port as socket address
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// `None` when the tally log is disabled
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }

    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            relapse_period_secs: self.relapse_period_secs,
            tick_interval: self.tick_interval(),
            idle_timeout_ticks: self.idle_timeout_ticks,
        }
    }

    /// Topic entries as catalog input
    pub fn topic_entries(&self) -> impl Iterator<Item = (TopicId, String)> + '_ {
        self.topics.iter().map(|t| (t.id, t.label.clone()))
    }
}
