use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8089,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Chat room tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Persisted room settings (bans, access mode, stream key)
    pub settings_path: String,
    /// Root of the emote tree served under `/emotes/`
    pub emote_dir: String,
    /// Broadcast flush period
    pub flush_interval_ms: u64,
    /// Capacity of the shared outbound fragment queue
    pub queue_capacity: usize,
    /// Per-session outbound buffer, in flushed batches
    pub outbound_buffer: usize,
    /// Chat text longer than this is truncated, in characters
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            settings_path: "settings.json".to_string(),
            emote_dir: "./static/emotes".to_string(),
            flush_interval_ms: 100,
            queue_capacity: 1000,
            outbound_buffer: 64,
            max_message_length: 400,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // MOVIENIGHT_SERVER__PORT, MOVIENIGHT_CHAT__EMOTE_DIR, ...
        builder = builder.add_source(
            Environment::with_prefix("MOVIENIGHT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP listen address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check for values the server cannot run with
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }
        if self.chat.settings_path.trim().is_empty() {
            errors.push("chat.settings_path must not be empty".to_string());
        }
        if self.chat.flush_interval_ms == 0 {
            errors.push("chat.flush_interval_ms must be greater than 0".to_string());
        }
        if self.chat.queue_capacity == 0 {
            errors.push("chat.queue_capacity must be greater than 0".to_string());
        }
        if self.chat.outbound_buffer == 0 {
            errors.push("chat.outbound_buffer must be greater than 0".to_string());
        }
        if self.chat.max_message_length == 0 {
            errors.push("chat.max_message_length must be greater than 0".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got {:?}",
                self.logging.format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 8089);
        assert_eq!(config.chat.flush_interval_ms, 100);
        assert_eq!(config.chat.max_message_length, 400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_address() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9000,
            },
            ..Config::default()
        };

        assert_eq!(config.http_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = Config::default();
        config.server.port = 0;
        config.chat.flush_interval_ms = 0;
        config.logging.format = "xml".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("logging.format")));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "server:\n  port: 7000\nchat:\n  emote_dir: /srv/emotes").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.chat.emote_dir, "/srv/emotes");
        // Untouched sections keep their defaults
        assert_eq!(config.chat.queue_capacity, 1000);
        assert_eq!(config.logging.level, "info");
    }
}
