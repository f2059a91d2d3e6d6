use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;

const DEFAULT_PORT: u16 = 5173;
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_MAX_PAGES_PER_CYCLE: usize = 50;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub atproto_service: Url,
    pub atproto_identifier: String,
    pub atproto_password: String,
    pub database_url: String,
    /// Public host of the viewer, used in reply links.
    pub domain: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub max_pages_per_cycle: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let atproto_service = require("ATPROTO_SERVICE")?;
        let atproto_service = Url::parse(&atproto_service)
            .with_context(|| format!("ATPROTO_SERVICE must be a valid URL, got '{atproto_service}'"))?;

        let max_pages_per_cycle = match lookup("MAX_PAGES_PER_CYCLE") {
            Some(raw) => raw
                .parse::<usize>()
                .context("MAX_PAGES_PER_CYCLE must be a positive integer")?,
            None => DEFAULT_MAX_PAGES_PER_CYCLE,
        };
        if max_pages_per_cycle == 0 {
            bail!("MAX_PAGES_PER_CYCLE must be at least 1");
        }

        Ok(Config {
            atproto_service,
            atproto_identifier: require("ATPROTO_IDENTIFIER")?,
            atproto_password: require("ATPROTO_PASSWORD")?,
            database_url: require("DATABASE_URL")?,
            domain: require("DOMAIN")?,
            port: match lookup("PORT") {
                Some(raw) => raw
                    .parse::<u16>()
                    .context("PORT must be a valid port number")?,
                None => DEFAULT_PORT,
            },
            poll_interval: Duration::from_millis(match lookup("POLL_INTERVAL_MS") {
                Some(raw) => raw
                    .parse::<u64>()
                    .context("POLL_INTERVAL_MS must be a number of milliseconds")?,
                None => DEFAULT_POLL_INTERVAL_MS,
            }),
            max_pages_per_cycle,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
