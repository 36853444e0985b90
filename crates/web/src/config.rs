use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub job_workers: usize,
    pub job_poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub job_lease: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8080)?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            job_workers: parse_or("JOB_WORKERS", 2)?,
            job_poll_interval: Duration::from_millis(parse_or("JOB_POLL_INTERVAL_MS", 5000)?),
            fetch_timeout: Duration::from_secs(parse_or("FETCH_TIMEOUT_SECS", 30)?),
            job_lease: Duration::from_secs(parse_or("JOB_LEASE_SECS", 900)?),
        })
    }
}

/// Reads `name` from the environment, falling back to `default` when it is unset.
fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
