//! Environment-driven configuration
//!
//! One `AppConfig` is built at startup and handed to the components that
//! need it; nothing reads the environment after boot.

use std::env;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Default look-aside cache entry lifetime in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default interval between maintenance sweeps (daily)
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Application configuration assembled from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. `sqlite://school.db`
    pub database_url: String,
    /// Lifetime for cached notification reads
    pub cache_ttl: Duration,
    /// Interval between notification-expiry sweeps
    pub maintenance_interval: Duration,
    /// When true, invite emails are logged instead of sent
    pub mailer_dry_run: bool,
    /// Base URL embedded in invite links
    pub invite_base_url: String,
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back to
    /// development defaults where a variable is absent
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://schoolhub.db".to_string());

        let cache_ttl = match env::var("CACHE_TTL_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                AppError::configuration(format!("CACHE_TTL_SECS is not a number: {raw}"))
            })?),
            Err(_) => Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        };

        let maintenance_interval = match env::var("MAINTENANCE_INTERVAL_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                AppError::configuration(format!("MAINTENANCE_INTERVAL_SECS is not a number: {raw}"))
            })?),
            Err(_) => Duration::from_secs(DEFAULT_MAINTENANCE_INTERVAL_SECS),
        };

        let mailer_dry_run = env::var("MAILER_DRY_RUN")
            .map(|v| v != "false")
            .unwrap_or(true);

        let invite_base_url = env::var("INVITE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/invites".to_string());

        Ok(Self {
            database_url,
            cache_ttl,
            maintenance_interval,
            mailer_dry_run,
            invite_base_url,
        })
    }
}
