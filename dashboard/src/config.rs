use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub poll_interval_ms: u64,
    pub log_limit: usize,
    pub agent_port: u16,             // port appended to the agent IP on settings save
    pub backtest_days: u32,
    pub backtest_capital: f64,
    pub request_timeout_secs: u64,   // 0 = transport default
    pub client_log: bool,            // forward diagnostics to /api/client_log
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8001".to_string(),
            poll_interval_ms: 2000,
            log_limit: 20,
            agent_port: 8001,
            backtest_days: 30,
            backtest_capital: 1000.0,
            request_timeout_secs: 0,
            client_log: true,
        }
    }
}

impl Config {
    /// Load config from a specific .env file, or the default `.env` if None.
    pub fn from_env_file(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p).with_context(|| format!("Loading config file {p}"))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::build_from_env()
    }

    fn build_from_env() -> Result<Self> {
        let defaults = Self::default();
        let api_base = env("API_BASE", &defaults.api_base);

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            log_limit: env_parse("LOG_LIMIT", defaults.log_limit)?,
            agent_port: env_parse("AGENT_PORT", defaults.agent_port)?,
            backtest_days: env_parse("BACKTEST_DAYS", defaults.backtest_days)?,
            backtest_capital: env_parse("BACKTEST_CAPITAL", defaults.backtest_capital)?,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            client_log: env("CLIENT_LOG", "true") == "true",
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: {val}")),
        Err(_) => Ok(default),
    }
}
