//! Runtime configuration from environment variables.
//!
//! HOST, PORT, COURT_COUNT, ACCESS_USERNAME, ACCESS_PASSWORD, SESSION_TTL_MINUTES,
//! COOKIE_SECURE, MIRROR_FILE. Missing or unparsable values fall back to defaults.

use crate::models::DEFAULT_COURT_COUNT;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub court_count: u32,
    pub access_username: String,
    pub access_password: String,
    pub session_ttl_minutes: u32,
    pub cookie_secure: bool,
    /// JSON file the session is mirrored to, if any.
    pub mirror_file: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_session_ttl_minutes() -> u32 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            court_count: DEFAULT_COURT_COUNT,
            access_username: "admin".to_string(),
            access_password: "1234".to_string(),
            session_ttl_minutes: default_session_ttl_minutes(),
            cookie_secure: false,
            mirror_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let court_count = parse_or(&lookup, "COURT_COUNT", defaults.court_count);
        let session_ttl_minutes =
            parse_or(&lookup, "SESSION_TTL_MINUTES", defaults.session_ttl_minutes);
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            court_count: if court_count == 0 {
                log::warn!("COURT_COUNT must be at least 1; using {}", DEFAULT_COURT_COUNT);
                DEFAULT_COURT_COUNT
            } else {
                court_count
            },
            access_username: lookup("ACCESS_USERNAME").unwrap_or(defaults.access_username),
            access_password: lookup("ACCESS_PASSWORD").unwrap_or(defaults.access_password),
            session_ttl_minutes: if session_ttl_minutes == 0 {
                log::warn!(
                    "SESSION_TTL_MINUTES must be at least 1; using {}",
                    defaults.session_ttl_minutes
                );
                defaults.session_ttl_minutes
            } else {
                session_ttl_minutes
            },
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", defaults.cookie_secure),
            mirror_file: lookup("MIRROR_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_or<T: FromStr + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}; using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
