use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Base URL the HTTP-backed services talk to (no trailing slash).
    pub api_base_url: String,
    /// When false, mock services answer immediately instead of sleeping.
    pub simulate_latency: bool,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            api_base_url: "http://localhost:3000/api".to_string(),
            simulate_latency: true,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        Ok(Config {
            port: parse_env("PORT", defaults.port).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            api_base_url: std::env::var("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            simulate_latency: parse_env("SIMULATE_LATENCY", defaults.simulate_latency)
                .context("SIMULATE_LATENCY must be true or false")?,
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
