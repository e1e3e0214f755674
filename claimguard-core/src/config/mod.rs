//! Configuration management for claimguard
//!
//! Settings come from a TOML file, then `CLAIMGUARD_<SECTION>_<KEY>`
//! environment variables override individual values.
//!
//! ```toml
//! [storage]
//! database_path = "claims.db"
//! pool_size = 4
//!
//! [protection]
//! default_radius = 10
//! overlap_policy = "reject"
//! worlds = ["world", "world_nether"]
//!
//! [protection.limits]
//! default = 1
//! tiers = { vip = 5 }
//!
//! [invitations]
//! ttl = "10m"
//!
//! [autosave]
//! enabled = true
//! interval = "5m"
//! ```

use crate::core_region::{ClaimLimits, ManagerSettings, OverlapPolicy, WorldId};
use crate::logging::{LogConfig, LogLevel};
use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Largest radius the `claim_anchors.radius` TINYINT column holds
pub const MAX_RADIUS: u32 = 127;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub protection: ProtectionConfig,
    pub invitations: InvitationConfig,
    pub autosave: AutoSaveConfig,
    pub messages: MessagesConfig,
    pub logging: LoggingConfig,
}

/// Where claims are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,
}

/// Placement rules for new claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Half-width of a new claim's cube
    pub default_radius: u32,

    pub overlap_policy: OverlapPolicy,

    /// Worlds that accept claims; empty means all
    pub worlds: Vec<String>,

    pub limits: ClaimLimits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    /// How long an invitation stays valid; unset keeps it until answered
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    pub enabled: bool,

    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

/// User-facing message templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// TOML file overriding the built-in English catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("claims.db"),
            pool_size: 4,
        }
    }
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            default_radius: 10,
            overlap_policy: OverlapPolicy::FirstMatch,
            worlds: Vec::new(),
            limits: ClaimLimits::default(),
        }
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(300),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl ProtectionConfig {
    /// Placement settings for the region manager
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            default_radius: self.default_radius,
            overlap_policy: self.overlap_policy,
            protected_worlds: self.worlds.iter().map(WorldId::new).collect(),
            default_limit: self.limits.limit_for::<&str>(&[]),
        }
    }
}

impl LoggingConfig {
    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        let level: LogLevel = self
            .level
            .parse()
            .map_err(|_| ConfigError::ValidationFailed(format!("Invalid log level: {}", self.level)))?;
        Ok(LogConfig::new(level)
            .json_format(self.json_format)
            .with_target(self.with_target))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

impl Config {
    /// Defaults plus environment overrides
    ///
    /// Environment variables follow the pattern: CLAIMGUARD_<SECTION>_<KEY>
    /// Example: CLAIMGUARD_PROTECTION_DEFAULT_RADIUS=16
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config = Self::from_toml_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// File when given (defaults otherwise), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CLAIMGUARD_*` overrides read through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // Storage config
        if let Some(path) = lookup("CLAIMGUARD_STORAGE_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("CLAIMGUARD_STORAGE_POOL_SIZE") {
            self.storage.pool_size = parse_value("CLAIMGUARD_STORAGE_POOL_SIZE", &raw)?;
        }

        // Protection config
        if let Some(raw) = lookup("CLAIMGUARD_PROTECTION_DEFAULT_RADIUS") {
            self.protection.default_radius = parse_value("CLAIMGUARD_PROTECTION_DEFAULT_RADIUS", &raw)?;
        }
        if let Some(raw) = lookup("CLAIMGUARD_PROTECTION_OVERLAP_POLICY") {
            self.protection.overlap_policy = match raw.as_str() {
                "first-match" => OverlapPolicy::FirstMatch,
                "reject" => OverlapPolicy::Reject,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "CLAIMGUARD_PROTECTION_OVERLAP_POLICY".to_string(),
                        reason: format!("expected first-match or reject, got '{}'", other),
                    })
                }
            };
        }
        if let Some(raw) = lookup("CLAIMGUARD_PROTECTION_WORLDS") {
            self.protection.worlds = raw
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(raw) = lookup("CLAIMGUARD_PROTECTION_DEFAULT_LIMIT") {
            self.protection.limits.default = parse_value("CLAIMGUARD_PROTECTION_DEFAULT_LIMIT", &raw)?;
        }

        // Invitation config
        if let Some(raw) = lookup("CLAIMGUARD_INVITATIONS_TTL") {
            self.invitations.ttl = match raw.as_str() {
                "" | "none" => None,
                value => Some(parse_duration("CLAIMGUARD_INVITATIONS_TTL", value)?),
            };
        }

        // Autosave config
        if let Some(raw) = lookup("CLAIMGUARD_AUTOSAVE_ENABLED") {
            self.autosave.enabled = parse_value("CLAIMGUARD_AUTOSAVE_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("CLAIMGUARD_AUTOSAVE_INTERVAL") {
            self.autosave.interval = parse_duration("CLAIMGUARD_AUTOSAVE_INTERVAL", &raw)?;
        }

        // Messages
        if let Some(path) = lookup("CLAIMGUARD_MESSAGES_FILE") {
            self.messages.file = Some(PathBuf::from(path));
        }

        // Logging config
        if let Some(level) = lookup("CLAIMGUARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = lookup("CLAIMGUARD_LOG_JSON") {
            self.logging.json_format = parse_value("CLAIMGUARD_LOG_JSON", &raw)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "storage.pool_size must be greater than 0".to_string(),
            ));
        }

        if self.protection.default_radius > MAX_RADIUS {
            return Err(ConfigError::ValidationFailed(format!(
                "protection.default_radius must be at most {}, got {}",
                MAX_RADIUS, self.protection.default_radius
            )));
        }

        if self.protection.worlds.iter().any(|w| w.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed(
                "protection.worlds must not contain empty names".to_string(),
            ));
        }

        if self.invitations.ttl == Some(Duration::ZERO) {
            return Err(ConfigError::ValidationFailed(
                "invitations.ttl must be greater than 0".to_string(),
            ));
        }

        if self.autosave.enabled && self.autosave.interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "autosave.interval must be greater than 0".to_string(),
            ));
        }

        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
