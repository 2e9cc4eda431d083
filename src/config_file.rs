//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{EncoderConfig, LimitsConfig, ServerConfig};
use crate::error::Result;

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Encoder settings
    pub encoder: Option<EncoderSettings>,
    /// Limits settings
    pub limits: Option<LimitsSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Encoder executable
    pub program: Option<PathBuf>,
    /// Conversion timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Staging directory
    pub staging_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Maximum upload size in MB
    pub max_upload_mb: Option<usize>,
    /// Maximum concurrent encoder processes
    pub max_concurrent_conversions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: ServerSettings {
                host: defaults.host,
                port: defaults.port,
                cors_enabled: Some(defaults.cors_enabled),
            },
            encoder: Some(EncoderSettings {
                program: Some(defaults.encoder.program),
                timeout_secs: Some(defaults.encoder.timeout_secs),
                staging_dir: None,
            }),
            limits: Some(LimitsSettings {
                max_upload_mb: Some(defaults.limits.max_upload_mb),
                max_concurrent_conversions: Some(defaults.limits.max_concurrent_conversions),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let encoder_defaults = EncoderConfig::default();
        let limits_defaults = LimitsConfig::default();
        let encoder = self.encoder.unwrap_or(EncoderSettings {
            program: None,
            timeout_secs: None,
            staging_dir: None,
        });
        let limits = self.limits.unwrap_or(LimitsSettings {
            max_upload_mb: None,
            max_concurrent_conversions: None,
        });

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            encoder: EncoderConfig {
                program: encoder.program.unwrap_or(encoder_defaults.program),
                timeout_secs: encoder.timeout_secs.unwrap_or(encoder_defaults.timeout_secs),
                staging_dir: encoder.staging_dir,
            },
            limits: LimitsConfig {
                max_upload_mb: limits.max_upload_mb.unwrap_or(limits_defaults.max_upload_mb),
                // Zero permits would stall every request.
                max_concurrent_conversions: limits
                    .max_concurrent_conversions
                    .unwrap_or(limits_defaults.max_concurrent_conversions)
                    .max(1),
            },
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_json: self
                .logging
                .as_ref()
                .and_then(|l| l.format.as_deref())
                .is_some_and(|f| f.eq_ignore_ascii_case("json")),
            log_level: self
                .logging
                .map(|l| l.level)
                .unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Load the server configuration from `path`.
///
/// A missing file yields `Ok(None)` so the caller can fall back to defaults.
pub fn load_server_config<P: AsRef<Path>>(path: P) -> Result<Option<ServerConfig>> {
    if !path.as_ref().exists() {
        return Ok(None);
    }
    let config = ConfigFile::from_file(path)?;
    Ok(Some(config.into_server_config()))
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
