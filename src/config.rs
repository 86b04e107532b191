// src/config.rs

use std::{env, net::SocketAddr, str::FromStr};

use dotenvy::dotenv;
use url::Url;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of issued API tokens, in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub openai_base_url: Url,
    pub llm_timeout_secs: u64,
    /// Attempts per completion. 1 disables retries.
    pub llm_max_attempts: u32,
    /// First backoff delay; doubled after every failed attempt.
    pub llm_backoff_ms: u64,
    pub mail_from: String,
    /// Malformed values that fell back to defaults. Logged once tracing is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        let openai_base_url = Url::parse(&openai_base_url)
            .expect("OPENAI_BASE_URL must be a valid URL");

        let mut warnings = Vec::new();
        let jwt_expiration: u64 = env_or("JWT_EXPIRATION", 60 * 60 * 24 * 30, &mut warnings);
        let llm_timeout_secs: u64 = env_or("LLM_TIMEOUT_SECS", 60, &mut warnings);
        let llm_backoff_ms: u64 = env_or("LLM_BACKOFF_MS", 500, &mut warnings);
        let llm_max_attempts = env_or::<u32>("LLM_MAX_ATTEMPTS", 3, &mut warnings).max(1);
        let bind_addr = env_or(
            "BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 3000)),
            &mut warnings,
        );

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            openai_base_url,
            llm_timeout_secs,
            llm_max_attempts,
            llm_backoff_ms,
            mail_from: env::var("MAIL_FROM").unwrap_or_default(),
            warnings,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T, warnings: &mut Vec<String>) -> T {
    parse_or(key, env::var(key).ok(), default, warnings)
}

/// Parses an optional raw value, falling back to `default` when it is absent or malformed.
/// Fallbacks go to `warnings`; tracing is not installed yet.
fn parse_or<T: FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring malformed {} value '{}'", key, value));
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or() {
        let mut warnings = Vec::new();
        assert_eq!(parse_or("N", Some(" 5 ".to_string()), 3u32, &mut warnings), 5);
        assert_eq!(parse_or::<u64>("N", None, 60, &mut warnings), 60);
        let addr: SocketAddr = parse_or(
            "BIND_ADDR",
            Some("127.0.0.1:8080".to_string()),
            SocketAddr::from(([0, 0, 0, 0], 3000)),
            &mut warnings,
        );
        assert_eq!(addr.port(), 8080);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_malformed_value_is_recorded() {
        let mut warnings = Vec::new();
        let attempts = parse_or("LLM_MAX_ATTEMPTS", Some("five".to_string()), 3u32, &mut warnings);

        assert_eq!(attempts, 3);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("LLM_MAX_ATTEMPTS"));
        assert!(warnings[0].contains("five"));
    }
}
