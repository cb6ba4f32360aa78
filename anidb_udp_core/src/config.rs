//! Client settings
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file, then `ANIDB_`-prefixed environment variables where `__`
//! separates sections (`ANIDB_NETWORK__PORT=9001`).

use crate::protocol::messages::AuthRequest;
use crate::protocol::rate_limiter::RateLimitConfig;
use crate::protocol::{DEFAULT_PORT, DEFAULT_SERVER, SESSION_TIMEOUT_SECS};
use crate::security::SecureString;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// AniDB bans clients that send faster than one packet every two seconds
pub const MIN_SHORT_DELAY_MS: u64 = 2000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Everything needed to open and drive a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub client: ClientIdentity,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub host: String,
    pub port: u16,
    /// Local UDP port; 0 picks an ephemeral one
    pub local_port: u16,
    pub request_timeout_secs: u64,
    /// Idle time after which the server forgets the session
    pub session_timeout_secs: u64,
    /// Log in with `nat=1`
    pub nat: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            local_port: 0,
            request_timeout_secs: 30,
            session_timeout_secs: SESSION_TIMEOUT_SECS,
            nat: false,
        }
    }
}

impl NetworkSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

/// Registered client name and version sent with AUTH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientIdentity {
    pub name: String,
    pub version: u32,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            name: "anidbudp".to_string(),
            version: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: SecureString,
}

/// Rate limiter tunables in config-friendly units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub short_delay_ms: u64,
    pub long_delay_ms: u64,
    pub short_period_secs: u64,
    pub reset_period_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            short_delay_ms: defaults.short_delay.as_millis() as u64,
            long_delay_ms: defaults.long_delay.as_millis() as u64,
            short_period_secs: defaults.short_period.as_secs(),
            reset_period_secs: defaults.reset_period.as_secs(),
        }
    }
}

impl RateLimitSettings {
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            short_delay: Duration::from_millis(self.short_delay_ms),
            long_delay: Duration::from_millis(self.long_delay_ms),
            short_period: Duration::from_secs(self.short_period_secs),
            reset_period: Duration::from_secs(self.reset_period_secs),
        }
    }
}

impl ClientSettings {
    /// Layered configuration source: defaults, then `path` if it exists,
    /// then the environment
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(ClientSettings::default()));

        if let Some(path) = path
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("ANIDB_").split("__"))
    }

    /// Load and validate settings
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Self = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would break the protocol contract
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = &self.rate_limit;
        if rate.short_delay_ms < MIN_SHORT_DELAY_MS {
            return Err(ConfigError::invalid(
                "rate_limit.short_delay_ms",
                format!("must be at least {MIN_SHORT_DELAY_MS}"),
            ));
        }
        if rate.long_delay_ms < rate.short_delay_ms {
            return Err(ConfigError::invalid(
                "rate_limit.long_delay_ms",
                "must not be below short_delay_ms",
            ));
        }
        if self.network.port == 0 {
            return Err(ConfigError::invalid("network.port", "must not be 0"));
        }
        if self.network.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "network.request_timeout_secs",
                "must not be 0",
            ));
        }
        if self.client.name.trim().is_empty() {
            return Err(ConfigError::invalid("client.name", "must not be empty"));
        }
        Ok(())
    }

    /// AUTH request for these credentials and client identity
    pub fn auth_request(&self) -> AuthRequest {
        let request = AuthRequest::new(
            self.credentials.username.clone(),
            self.credentials.password.clone(),
            self.client.name.clone(),
            self.client.version,
        );
        if self.network.nat {
            request.with_nat()
        } else {
            request
        }
    }
}
