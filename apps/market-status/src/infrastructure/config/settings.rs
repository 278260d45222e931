//! Service Configuration Settings
//!
//! Configuration types for the market status service, loaded from
//! environment variables.

use std::time::Duration;

/// Finnhub API token.
#[derive(Clone)]
pub struct ApiToken {
    token: String,
}

impl ApiToken {
    /// Create a new token wrapper.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self { token }
    }

    /// Get the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0, // Unlimited
        }
    }
}

/// Holiday calendar settings.
#[derive(Debug, Clone)]
pub struct CalendarSettings {
    /// Interval between scheduled holiday refreshes.
    pub refresh_interval: Duration,
    /// Exchange code passed to the holiday source.
    pub exchange: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(6 * 60 * 60),
            exchange: "US".to_string(),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// JSON API HTTP port.
    pub api_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { api_port: 8000 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Finnhub API token.
    pub token: ApiToken,
    /// Server port settings.
    pub server: ServerSettings,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Holiday calendar settings.
    pub calendar: CalendarSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FINNHUB_TOKEN` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("FINNHUB_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("FINNHUB_TOKEN".to_string()))?;

        if token.is_empty() {
            return Err(ConfigError::EmptyValue("FINNHUB_TOKEN".to_string()));
        }

        let server = ServerSettings {
            api_port: parse_env_u16("MARKET_STATUS_API_PORT", ServerSettings::default().api_port),
        };

        let websocket = WebSocketSettings {
            reconnect_delay_initial: parse_env_duration_millis(
                "MARKET_STATUS_RECONNECT_DELAY_INITIAL_MS",
                WebSocketSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "MARKET_STATUS_RECONNECT_DELAY_MAX_SECS",
                WebSocketSettings::default().reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "MARKET_STATUS_RECONNECT_DELAY_MULTIPLIER",
                WebSocketSettings::default().reconnect_delay_multiplier,
            ),
            max_reconnect_attempts: parse_env_u32(
                "MARKET_STATUS_MAX_RECONNECT_ATTEMPTS",
                WebSocketSettings::default().max_reconnect_attempts,
            ),
        };

        let calendar = CalendarSettings {
            refresh_interval: parse_env_duration_secs(
                "MARKET_STATUS_HOLIDAY_REFRESH_SECS",
                CalendarSettings::default().refresh_interval,
            ),
            exchange: std::env::var("FINNHUB_EXCHANGE")
                .unwrap_or_else(|_| CalendarSettings::default().exchange),
        };

        Ok(Self {
            token: ApiToken::new(token),
            server,
            websocket,
            calendar,
        })
    }

    /// Get the trade stream WebSocket URL.
    ///
    /// The token rides in the query string; never log this value.
    #[must_use]
    pub fn stream_url(&self) -> String {
        format!("wss://ws.finnhub.io?token={}", self.token.as_str())
    }

    /// Get the REST API base URL.
    #[must_use]
    pub fn rest_base_url(&self) -> &'static str {
        "https://finnhub.io/api/v1"
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
