use std::str::FromStr;

use anyhow::{ensure, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset, roadmaps are kept in process memory (local development only).
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_max_attempts: u32,
    pub llm_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_var("PORT", std::env::var("PORT").ok(), 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_max_attempts: parse_var(
                "LLM_MAX_ATTEMPTS",
                std::env::var("LLM_MAX_ATTEMPTS").ok(),
                1,
            )?,
            llm_timeout_secs: parse_var(
                "LLM_TIMEOUT_SECS",
                std::env::var("LLM_TIMEOUT_SECS").ok(),
                120,
            )?,
        };

        ensure!(config.llm_max_attempts >= 1, "LLM_MAX_ATTEMPTS must be at least 1");
        ensure!(config.llm_timeout_secs >= 1, "LLM_TIMEOUT_SECS must be at least 1");
        Ok(config)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{value}'")),
    }
}
