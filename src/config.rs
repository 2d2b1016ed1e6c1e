use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use crate::tmdb::{PagingLimits, TMDB_BASE};

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_DEBOUNCE_MS: u64 = 600;
const DEFAULT_BIND: &str = "0.0.0.0:3146";

pub const REQUIRED_ENV: [&str; 3] = ["TMDB_API_KEY", "FIREBASE_API_KEY", "FIREBASE_PROJECT_ID"];

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub firebase_api_key: String,
    pub firebase_project_id: String,
    pub firestore_base_url: String,
    pub auth_base_url: String,
    pub search_debounce: Duration,
    pub paging: PagingLimits,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        for key in REQUIRED_ENV {
            if env::var(key).map(|v| v.is_empty()).unwrap_or(true) {
                anyhow::bail!("Missing required environment variable: {}", key);
            }
        }

        let debounce_ms: u64 = parse_or("SEARCH_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;
        if debounce_ms == 0 {
            anyhow::bail!("SEARCH_DEBOUNCE_MS must be positive");
        }
        let defaults = PagingLimits::default();
        let paging = PagingLimits {
            max_results: parse_or("CATALOG_MAX_RESULTS", defaults.max_results)?,
            max_pages: parse_or("CATALOG_MAX_PAGES", defaults.max_pages)?,
        };
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;

        let config = Self {
            tmdb_api_key: env::var("TMDB_API_KEY")?,
            tmdb_base_url: env_or("TMDB_BASE_URL", TMDB_BASE),
            firebase_api_key: env::var("FIREBASE_API_KEY")?,
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")?,
            firestore_base_url: env_or("FIRESTORE_BASE_URL", FIRESTORE_BASE),
            auth_base_url: env_or("FIREBASE_AUTH_BASE_URL", IDENTITY_TOOLKIT_BASE),
            search_debounce: Duration::from_millis(debounce_ms),
            paging,
            bind_addr,
        };
        info!(
            project = %config.firebase_project_id,
            debounce_ms,
            max_results = config.paging.max_results,
            max_pages = config.paging.max_pages,
            "Configuration loaded"
        );
        Ok(config)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        _ => Ok(default),
    }
}
