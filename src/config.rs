//! # Configuration Management
//!
//! Wire constants for the frame layout, and structured configuration for
//! packet sizing and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Frame Layout
//! ```text
//! [FrameLength(2)] [Adler32(4)] [PayloadLength(2)] [Payload(N)]
//!                  ^ covers [6, len)   ^ XTEA from offset 6 to len
//! ```

use crate::error::{ProtocolError, Result};
use crate::utils::crypto::BLOCK_SIZE;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Size of the frame length prefix at offset 0
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Offset of the Adler-32 checksum
pub const CHECKSUM_OFFSET: usize = 2;

/// Offset of the logical payload length; the cipher starts here too
pub const PAYLOAD_LENGTH_OFFSET: usize = 6;

/// Bytes reserved in front of the payload of an encrypted frame
pub const HEADER_SIZE: usize = 8;

/// Storage capacity used when none is given
pub const DEFAULT_CAPACITY: usize = 16394;

/// Largest frame whose length fits the 16-bit prefix
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize + LENGTH_FIELD_SIZE;

/// Smallest frame the codec will accept from a stream
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE;

/// Smallest encrypted frame: length, checksum and a single cipher block
pub const MIN_ENCRYPTED_FRAME_SIZE: usize = PAYLOAD_LENGTH_OFFSET + BLOCK_SIZE;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CodecConfig {
    /// Packet sizing
    #[serde(default)]
    pub packet: PacketConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(capacity) = std::env::var("GAMEWIRE_PACKET_CAPACITY") {
            config.packet.capacity = capacity.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!(
                    "Invalid GAMEWIRE_PACKET_CAPACITY '{capacity}': {e}"
                ))
            })?;
        }

        if let Ok(max) = std::env::var("GAMEWIRE_MAX_FRAME_SIZE") {
            config.packet.max_frame_size = max.parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid GAMEWIRE_MAX_FRAME_SIZE '{max}': {e}"))
            })?;
        }

        if let Ok(level) = std::env::var("GAMEWIRE_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid GAMEWIRE_LOG_LEVEL '{level}'"))
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
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.packet.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Packet sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacketConfig {
    /// Storage capacity of write-mode buffers
    pub capacity: usize,

    /// Largest frame the stream codec accepts or emits
    pub max_frame_size: usize,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_frame_size: DEFAULT_CAPACITY,
        }
    }
}

impl PacketConfig {
    /// Validate packet configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.capacity < MIN_ENCRYPTED_FRAME_SIZE {
            errors.push(format!(
                "Packet capacity too small: {} bytes (minimum: {MIN_ENCRYPTED_FRAME_SIZE})",
                self.capacity
            ));
        } else if self.capacity > MAX_FRAME_SIZE {
            errors.push(format!(
                "Packet capacity too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.capacity
            ));
        }

        if self.max_frame_size < MIN_ENCRYPTED_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too small: {} bytes (minimum: {MIN_ENCRYPTED_FRAME_SIZE})",
                self.max_frame_size
            ));
        } else if self.max_frame_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.max_frame_size
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

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("gamewire"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
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

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
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
