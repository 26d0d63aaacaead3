//! # Configuration Management
//!
//! Centralized configuration for the codec, the client and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! The string/binary chunk size is part of the wire format and is deliberately
//! not configurable; see [`CHUNK_SIZE`](crate::core::packing::CHUNK_SIZE).

use crate::error::{HessianError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Max accepted message size (16 MB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default nesting limit for lists, maps and objects
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default timeout for one remote call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HessianConfig {
    /// Client-side settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Decoder limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HessianConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| HessianError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| HessianError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| HessianError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HESSIAN_HOST") {
            config.client.host = host;
        }

        if let Ok(url) = std::env::var("HESSIAN_URL") {
            config.client.url = url;
        }

        if let Ok(timeout) = std::env::var("HESSIAN_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                HessianError::ConfigError(format!("Invalid HESSIAN_TIMEOUT_MS '{timeout}': {e}"))
            })?;
            config.client.timeout = Duration::from_millis(val);
        }

        if let Ok(depth) = std::env::var("HESSIAN_MAX_DEPTH") {
            config.codec.max_depth = depth.parse::<usize>().map_err(|e| {
                HessianError::ConfigError(format!("Invalid HESSIAN_MAX_DEPTH '{depth}': {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("HESSIAN_MAX_MESSAGE_SIZE") {
            config.codec.max_message_size = size.parse::<usize>().map_err(|e| {
                HessianError::ConfigError(format!("Invalid HESSIAN_MAX_MESSAGE_SIZE '{size}': {e}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HessianError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| HessianError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration; an empty list means it is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HessianError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Where and how the client calls a service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Service host, e.g. "http://127.0.0.1:8080"
    pub host: String,

    /// Service path appended to the host, e.g. "/api/orders"
    pub url: String,

    /// Timeout for one call, request and reply included
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from("http://127.0.0.1:8080"),
            url: String::from("/"),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Full request location: host followed by url
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.host, self.url)
    }

    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Client host cannot be empty".to_string());
        }

        if self.timeout.as_millis() < 10 {
            errors.push("Call timeout too short (minimum: 10ms)".to_string());
        } else if self.timeout.as_secs() > 600 {
            errors.push("Call timeout too long (maximum: 600s)".to_string());
        }

        errors
    }
}

/// Limits applied while decoding untrusted input
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum nesting of lists, maps and objects
    pub max_depth: usize,

    /// Maximum size of one message in bytes
    pub max_message_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl CodecConfig {
    /// Validate codec limits
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_depth == 0 {
            errors.push("Max depth must be greater than 0".to_string());
        } else if self.max_depth > 4096 {
            errors.push(format!(
                "Max depth too large: {} (maximum: 4096)",
                self.max_depth
            ));
        }

        if self.max_message_size == 0 {
            errors.push("Max message size must be greater than 0".to_string());
        } else if self.max_message_size > 1024 * 1024 * 1024 {
            errors.push(format!(
                "Max message size too large: {} bytes (maximum: 1 GiB)",
                self.max_message_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("hessian-codec"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
