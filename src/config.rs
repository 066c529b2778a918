//! Startup configuration
//!
//! Everything here is read once, before playback, into plain values that are
//! handed to the session. Nothing is reloaded mid-track.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

pub const API_KEY_VAR: &str = "SHOCK_API_KEY";
pub const DEVICE_ID_VAR: &str = "SHOCK_ID";
pub const ENDPOINT_VAR: &str = "SHOCK_API_URL";
pub const CUSTOM_NAME_VAR: &str = "SHOCK_CUSTOM_NAME";

pub const DEFAULT_ENDPOINT: &str = "https://api.shocklink.net/2/shockers/control";
pub const DEFAULT_CUSTOM_NAME: &str = "ImmersiveASMR";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_DRIFT_TOLERANCE: Duration = Duration::from_millis(40);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set (add it to the environment or a .env file)")]
    Missing(&'static str),

    #[error("{0} is set but empty")]
    Empty(&'static str),

    #[error("could not load env file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },

    #[error("{name} must be between 1ms and {max:?}, got {value:?}")]
    InvalidTiming {
        name: &'static str,
        value: Duration,
        max: Duration,
    },
}

/// API credential; never printed in full
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret, for the request header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({self})")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&"*".repeat(self.0.chars().count().min(12)))
    }
}

/// Identity and credential of the target device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub api_key: ApiKey,
    pub device_id: String,
    pub endpoint: String,
    /// Shown in the device owner's activity log
    pub custom_name: String,
}

impl DeviceSettings {
    /// Read from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            let value = lookup(name).ok_or(ConfigError::Missing(name))?;
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(ConfigError::Empty(name));
            }
            Ok(value)
        };
        let optional = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            api_key: ApiKey::new(required(API_KEY_VAR)?),
            device_id: required(DEVICE_ID_VAR)?,
            endpoint: optional(ENDPOINT_VAR, DEFAULT_ENDPOINT),
            custom_name: optional(CUSTOM_NAME_VAR, DEFAULT_CUSTOM_NAME),
        })
    }
}

/// Scheduler and dispatch timing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// How often the scheduler checks the clock
    pub poll_interval: Duration,
    /// Upper bound on one device request
    pub dispatch_timeout: Duration,
    /// Dispatches later than this past their cue are logged as late
    pub drift_tolerance: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE,
        }
    }
}

impl Timing {
    pub fn validate(self) -> Result<Self, ConfigError> {
        check("poll interval", self.poll_interval, MAX_POLL_INTERVAL)?;
        check("dispatch timeout", self.dispatch_timeout, Duration::from_secs(60))?;
        check("drift tolerance", self.drift_tolerance, Duration::from_secs(10))?;
        if self.drift_tolerance < self.poll_interval {
            tracing::warn!(
                poll_ms = self.poll_interval.as_millis() as u64,
                drift_ms = self.drift_tolerance.as_millis() as u64,
                "poll interval exceeds drift tolerance; expect late-cue warnings"
            );
        }
        Ok(self)
    }
}

fn check(name: &'static str, value: Duration, max: Duration) -> Result<(), ConfigError> {
    if value.is_zero() || value > max {
        return Err(ConfigError::InvalidTiming { name, value, max });
    }
    Ok(())
}

/// Everything a playback session needs from configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` plays audio without contacting any device
    pub device: Option<DeviceSettings>,
    pub timing: Timing,
}

/// Load `.env` files from the default locations
///
/// `./.env` first, then `~/.env`. dotenv never overwrites a variable that is
/// already set, so the real environment beats `./.env`, which beats the home
/// directory file. Call before parsing CLI arguments so `env` fallbacks see
/// the values.
pub fn load_env_files() {
    dotenv::dotenv().ok();

    if let Some(home) = dirs::home_dir() {
        dotenv::from_path(home.join(".env")).ok();
    }
}

/// Load one explicitly requested env file; unlike the defaults it must exist
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    dotenv::from_path(path).map_err(|err| ConfigError::EnvFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    tracing::info!(path = %path.display(), "loaded env file");
    Ok(())
}
