//! Process settings, read once at startup from the environment (optionally seeded by `.env`).

use crate::catalog::Variant;
use crate::llm_client::{LlmConfig, Provider};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const API_KEY_VARS: [&str; 2] = ["COPYGEN_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub variant: Variant,
    pub llm: LlmConfig,
    pub download_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = match get("COPYGEN_PROVIDER") {
            Some(p) => Provider::from_str(&p)?,
            None => Provider::default(),
        };

        let api_key = API_KEY_VARS.iter().find_map(|&k| get(k)).unwrap_or_else(|| {
            warn!("No API key set ({}); requests will fail to authenticate", API_KEY_VARS.join(" / "));
            String::new()
        });

        let mut llm = LlmConfig::new(provider, api_key);
        if let Some(model) = get("COPYGEN_MODEL") {
            llm.model = model;
        }
        if let Some(base_url) = get("COPYGEN_BASE_URL") {
            llm.base_url = base_url;
        }
        if let Some(retries) = get("COPYGEN_MAX_RETRIES") {
            llm.transport.max_retries = parse_number("COPYGEN_MAX_RETRIES", &retries)?;
        }
        if let Some(secs) = get("COPYGEN_CONNECT_TIMEOUT_S") {
            llm.transport.connect_timeout =
                Duration::from_secs(parse_number("COPYGEN_CONNECT_TIMEOUT_S", &secs)?);
        }
        if let Some(secs) = get("COPYGEN_READ_TIMEOUT_S") {
            llm.transport.read_timeout =
                Duration::from_secs(parse_number("COPYGEN_READ_TIMEOUT_S", &secs)?);
        }

        let variant = match get("COPYGEN_VARIANT") {
            Some(v) => Variant::from_str(&v)?,
            None => Variant::default(),
        };

        let download_dir = get("COPYGEN_DOWNLOAD_DIR").map(PathBuf::from);

        info!(
            "Settings loaded: variant={} provider={} model={}",
            variant, llm.provider, llm.model
        );
        Ok(Self { variant, llm, download_dir })
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, value))
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment variables from: {}", path.display()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to load .env file: {}", e),
    }
}
