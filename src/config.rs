use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::order::TrackingConfig;
use crate::gesture::GestureConfig;
use crate::notifications::NotificationConfig;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read from the environment (and a .env file if present). Every value has a
// default, so an empty environment yields a working demo setup.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tracking: TrackingConfig,
    pub notifications: NotificationConfig,
    pub gesture: GestureConfig,
    /// How long the delivery acknowledgment stays up.
    pub completion_delay: Duration,
    /// Where the order collection is mirrored; no mirroring when unset.
    pub snapshot_path: Option<PathBuf>,
    /// Partner requester bookings are assigned to; none when empty.
    pub default_partner: Option<String>,
    pub metrics_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            notifications: NotificationConfig::default(),
            gesture: GestureConfig::default(),
            completion_delay: Duration::from_millis(2000),
            snapshot_path: None,
            default_partner: Some("p1".to_string()),
            metrics_port: 9090,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present

        let config = Self::from_lookup(|name| env::var(name).ok())?;
        tracing::info!(
            tracking_prefix = %config.tracking.prefix,
            snapshot = ?config.snapshot_path,
            metrics_port = config.metrics_port,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Build from any variable source; `lookup` returns `None` for unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let prefix = get("LAUNDRO_TRACKING_PREFIX").unwrap_or(defaults.tracking.prefix);
        let length: usize = parse(&get, "LAUNDRO_TRACKING_LENGTH", defaults.tracking.length)?;
        if length == 0 {
            return Err(ConfigError::Invalid {
                var: "LAUNDRO_TRACKING_LENGTH",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let ttl_ms = parse(&get, "LAUNDRO_NOTIFICATION_TTL_MS", 5000u64)?;
        let threshold: f64 = parse(&get, "LAUNDRO_GESTURE_THRESHOLD", defaults.gesture.threshold)?;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigError::Invalid {
                var: "LAUNDRO_GESTURE_THRESHOLD",
                value: threshold.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        let settle_ms = parse(&get, "LAUNDRO_SETTLE_DELAY_MS", 1200u64)?;
        let completion_ms = parse(&get, "LAUNDRO_COMPLETION_DELAY_MS", 2000u64)?;

        let default_partner = match lookup("LAUNDRO_DEFAULT_PARTNER") {
            // Explicitly empty disables auto-assignment
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v),
            None => defaults.default_partner,
        };

        Ok(Self {
            tracking: TrackingConfig { prefix, length },
            notifications: NotificationConfig {
                ttl: Duration::from_millis(ttl_ms),
            },
            gesture: GestureConfig {
                threshold,
                settle_delay: Duration::from_millis(settle_ms),
            },
            completion_delay: Duration::from_millis(completion_ms),
            snapshot_path: get("LAUNDRO_SNAPSHOT_PATH").map(PathBuf::from),
            default_partner,
            metrics_port: parse(&get, "METRICS_PORT", defaults.metrics_port)?,
        })
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
