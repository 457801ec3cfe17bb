//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_MAX_REQUESTS`: Requests allowed per client per window
//!   (default: 10, 0 = disabled)
//! - `RATE_LIMIT_WINDOW_SECS`: Sliding window duration (default: 60)
//! - `RATE_LIMIT_SWEEP_INTERVAL_SECS`: Cadence of the background sweep that
//!   drops clients with no recent requests (default: window duration)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Maximum requests per client within the sliding window (default: 10).
    /// Set to 0 to disable rate limiting.
    pub rate_limit_max_requests: u32,

    /// Sliding window duration (default: 60 seconds)
    pub rate_limit_window: Duration,

    /// Interval for the background sweep of idle client windows.
    /// Defaults to the window duration.
    pub rate_limit_sweep_interval: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any configuration value is invalid
    /// (e.g., a non-numeric PORT value, or a zero-length window).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let window_secs: u64 = Self::parse_env("RATE_LIMIT_WINDOW_SECS", 60)?;

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Rate limiting
            rate_limit_max_requests: Self::parse_env("RATE_LIMIT_MAX_REQUESTS", 10)?,
            rate_limit_window: Duration::from_secs(window_secs),
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                window_secs,
            )?),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit_window.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_WINDOW_SECS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if rate limiting is enabled.
    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit_max_requests > 0
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    /// Defaults used when no environment is consulted (tests, embedding).
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            rate_limit_max_requests: 10,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_sweep_interval: Duration::from_secs(60),
            log_level: "info".to_string(),
        }
    }
}
