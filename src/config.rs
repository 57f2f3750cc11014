//! Runtime configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a default except `DATABASE_URL`. Values that fail to parse
//! fall back to their defaults rather than aborting startup.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_IMAGE_ROOT: &str = "./data/images";
pub const DEFAULT_IMAGE_PUBLIC_BASE: &str = "/images";
pub const DEFAULT_SCRAPE_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SCRAPE_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SCRAPE_USER_AGENT: &str = "insightboard/0.1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Optional ownership checks on reads and image replacement. Both default to
/// off; flip them per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Require the caller to own the pin's board before replacing its image.
    pub pin_image_requires_owner: bool,
    /// Require the caller to own a persona before reading it.
    pub persona_find_requires_owner: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub image_root: PathBuf,
    pub image_public_base: String,
    pub scrape_timeouts: ScrapeTimeouts,
    pub scrape_user_agent: String,
    pub access: AccessPolicy,
    /// Enables `POST /api/dev/session`.
    pub dev_auth_bypass: bool,
    /// Marks the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional (see constants for defaults):
    /// - `PORT`, `DB_MAX_CONNECTIONS`
    /// - `IMAGE_ROOT`, `IMAGE_PUBLIC_BASE`
    /// - `SCRAPE_REQUEST_TIMEOUT_SECS`, `SCRAPE_CONNECT_TIMEOUT_SECS`, `SCRAPE_USER_AGENT`
    /// - `PIN_IMAGE_REQUIRE_OWNER`, `PERSONA_FIND_REQUIRE_OWNER`, `DEV_AUTH_BYPASS`, `COOKIE_SECURE`
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let image_public_base = std::env::var("IMAGE_PUBLIC_BASE")
            .unwrap_or_else(|_| DEFAULT_IMAGE_PUBLIC_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let image_public_base = if image_public_base.is_empty() {
            DEFAULT_IMAGE_PUBLIC_BASE.to_string()
        } else {
            image_public_base
        };

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            image_root: std::env::var("IMAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_IMAGE_ROOT)),
            image_public_base,
            scrape_timeouts: ScrapeTimeouts {
                request_secs: env_parse("SCRAPE_REQUEST_TIMEOUT_SECS", DEFAULT_SCRAPE_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("SCRAPE_CONNECT_TIMEOUT_SECS", DEFAULT_SCRAPE_CONNECT_TIMEOUT_SECS),
            },
            scrape_user_agent: std::env::var("SCRAPE_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_SCRAPE_USER_AGENT.to_string()),
            access: AccessPolicy {
                pin_image_requires_owner: env_bool("PIN_IMAGE_REQUIRE_OWNER").unwrap_or(false),
                persona_find_requires_owner: env_bool("PERSONA_FIND_REQUIRE_OWNER").unwrap_or(false),
            },
            dev_auth_bypass: env_bool("DEV_AUTH_BYPASS").unwrap_or(false),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
