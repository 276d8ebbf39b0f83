//! Engine tuning configuration: a JSON file with an env-var path override,
//! every knob backed by a built-in default, and startup-fatal validation of
//! store credentials.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_CONFIG_PATH";

/// Default trailing-edge debounce window for refresh coalescing.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);
/// Default fixed interval for fallback polling.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default safety-net interval guarding against silent subscription death.
pub const DEFAULT_SAFETY_INTERVAL: Duration = Duration::from_secs(10);
/// Default cap on background reconnect attempts before settling into polling.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

const DEFAULT_RECONNECT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_FETCH_CONCURRENCY: usize = 8;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable runtime configuration for the live score engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Trailing-edge debounce window coalescing refresh signals.
    pub debounce_window: Duration,
    /// Fixed polling interval used while the push channel is down.
    pub poll_interval: Duration,
    /// How long the subscription may stay quiet before a safety refresh.
    pub safety_interval: Duration,
    /// Background reconnect attempts before polling becomes the stable mode.
    pub max_reconnect_attempts: u32,
    /// First reconnect backoff delay; doubles on each failed attempt.
    pub reconnect_initial_delay: Duration,
    /// Upper bound on the reconnect backoff delay.
    pub reconnect_max_delay: Duration,
    /// Worker-pool bound on concurrent per-game event fetches.
    pub fetch_concurrency: usize,
    /// Deadline applied to each per-game event fetch.
    pub fetch_timeout: Duration,
    /// Remote store credentials, when a remote backend is configured.
    pub store: Option<StoreCredentials>,
}

/// Credential pair for a remote event store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    /// Base URL of the backend.
    pub url: String,
    /// API key presented on every request.
    pub api_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            safety_interval: DEFAULT_SAFETY_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_initial_delay: DEFAULT_RECONNECT_INITIAL_DELAY,
            reconnect_max_delay: DEFAULT_RECONNECT_MAX_DELAY,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            store: None,
        }
    }
}

impl EngineConfig {
    /// Load the engine configuration from disk.
    ///
    /// A missing file falls back to the built-in defaults; a malformed file
    /// logs a warning and does the same. Values that are present but invalid,
    /// and partial store credentials, are fatal.
    pub fn load() -> Result<Self, ConfigError> {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded engine configuration");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            debounce_window: millis_or(raw.debounce_window_ms, defaults.debounce_window),
            poll_interval: millis_or(raw.poll_interval_ms, defaults.poll_interval),
            safety_interval: millis_or(raw.safety_interval_ms, defaults.safety_interval),
            max_reconnect_attempts: raw
                .max_reconnect_attempts
                .unwrap_or(defaults.max_reconnect_attempts),
            reconnect_initial_delay: millis_or(
                raw.reconnect_initial_delay_ms,
                defaults.reconnect_initial_delay,
            ),
            reconnect_max_delay: millis_or(raw.reconnect_max_delay_ms, defaults.reconnect_max_delay),
            fetch_concurrency: raw.fetch_concurrency.unwrap_or(defaults.fetch_concurrency),
            fetch_timeout: millis_or(raw.fetch_timeout_ms, defaults.fetch_timeout),
            store: raw.store.map(StoreCredentials::try_from).transpose()?,
        };

        if config.debounce_window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "debounce_window_ms",
                reason: "must be strictly positive".into(),
            });
        }
        if config.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_ms",
                reason: "must be strictly positive".into(),
            });
        }
        if config.safety_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "safety_interval_ms",
                reason: "must be strictly positive".into(),
            });
        }
        if config.fetch_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch_concurrency",
                reason: "at least one fetch worker is required".into(),
            });
        }

        Ok(config)
    }
}

fn millis_or(raw: Option<u64>, default: Duration) -> Duration {
    raw.map(Duration::from_millis).unwrap_or(default)
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    debounce_window_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    safety_interval_ms: Option<u64>,
    max_reconnect_attempts: Option<u32>,
    reconnect_initial_delay_ms: Option<u64>,
    reconnect_max_delay_ms: Option<u64>,
    fetch_concurrency: Option<usize>,
    fetch_timeout_ms: Option<u64>,
    store: Option<RawStoreCredentials>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of the optional remote store section.
struct RawStoreCredentials {
    url: Option<String>,
    api_key: Option<String>,
}

impl TryFrom<RawStoreCredentials> for StoreCredentials {
    type Error = ConfigError;

    fn try_from(raw: RawStoreCredentials) -> Result<Self, ConfigError> {
        match (raw.url, raw.api_key) {
            (Some(url), Some(api_key)) if !url.trim().is_empty() && !api_key.trim().is_empty() => {
                Ok(Self { url, api_key })
            }
            _ => Err(ConfigError::PartialStoreCredentials),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_raw_config_yields_defaults() {
        let config = EngineConfig::from_raw(RawConfig::default()).unwrap();
        assert_eq!(config.debounce_window, DEFAULT_DEBOUNCE_WINDOW);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_reconnect_attempts, DEFAULT_MAX_RECONNECT_ATTEMPTS);
        assert!(config.store.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let raw = RawConfig {
            debounce_window_ms: Some(100),
            fetch_concurrency: Some(2),
            ..RawConfig::default()
        };
        let config = EngineConfig::from_raw(raw).unwrap();
        assert_eq!(config.debounce_window, Duration::from_millis(100));
        assert_eq!(config.fetch_concurrency, 2);
    }

    #[test]
    fn partial_store_credentials_are_fatal() {
        let raw = RawConfig {
            store: Some(RawStoreCredentials {
                url: Some("https://stats.example".into()),
                api_key: None,
            }),
            ..RawConfig::default()
        };
        assert_eq!(
            EngineConfig::from_raw(raw).unwrap_err(),
            ConfigError::PartialStoreCredentials
        );
    }

    #[test]
    fn zero_debounce_window_is_rejected() {
        let raw = RawConfig {
            debounce_window_ms: Some(0),
            ..RawConfig::default()
        };
        assert!(matches!(
            EngineConfig::from_raw(raw),
            Err(ConfigError::InvalidValue {
                field: "debounce_window_ms",
                ..
            })
        ));
    }
}
