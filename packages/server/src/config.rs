//! Environment-driven configuration with sensible local defaults.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    /// Origins allowed by CORS, comma-separated in `FRONTEND_URL`.
    pub frontend_origins: Vec<String>,
    pub provider_timeout: Duration,
    pub job_timeout: Duration,
    pub max_results: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: env_parse("PORT", 8000)?,
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "data/jobs".to_string())
                .into(),
            reports_dir: std::env::var("REPORTS_DIR")
                .unwrap_or_else(|_| "data/reports".to_string())
                .into(),
            frontend_origins: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            provider_timeout: Duration::from_secs(env_parse("PROVIDER_TIMEOUT_SECS", 10)?),
            job_timeout: Duration::from_secs(env_parse("JOB_TIMEOUT_SECS", 120)?),
            max_results: env_parse("MAX_RESULTS", 20)?,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}")),
        Err(_) => Ok(default),
    }
}
