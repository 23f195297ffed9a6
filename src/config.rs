use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SEASON: u16 = 2026;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OPENAI_MODEL: &str = "gpt-5";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub season: u16,
    pub data_dir: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub player_ids_cache: Option<PathBuf>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests don't have to touch the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let season = match var("NBA_SEASON") {
            Some(s) => s
                .trim()
                .parse()
                .with_context(|| format!("NBA_SEASON is not a year: {}", s))?,
            None => DEFAULT_SEASON,
        };

        let http_timeout_secs = match var("HTTP_TIMEOUT_SECS") {
            Some(s) => s
                .trim()
                .parse()
                .with_context(|| format!("HTTP_TIMEOUT_SECS is not a number: {}", s))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            season,
            data_dir: var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            player_ids_cache: var("PLAYER_IDS_CACHE").map(PathBuf::from),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn require_openai_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY not set in .env file")
    }
}
