use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_SOURCES: &str = "jobs_for_lebanon,hire_lebanese";

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bypass title suggestion, acquisition and scoring; serve fixture matches.
    pub testing_mode: bool,
    /// Absent only when `testing_mode` is on.
    pub anthropic_api_key: Option<String>,
    pub enabled_sources: Vec<String>,
    pub sources_file: Option<PathBuf>,
    pub scrape_timeout: Duration,
    pub bus_subscriber_capacity: usize,
    pub broadcast_queue_capacity: usize,
    pub broadcast_send_timeout: Duration,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let testing_mode = match std::env::var("TESTING_MODE") {
            Ok(raw) => parse_bool(&raw).context("TESTING_MODE must be a boolean")?,
            Err(_) => false,
        };

        let anthropic_api_key = match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(key),
            _ if testing_mode => None,
            _ => bail!("Required environment variable 'ANTHROPIC_API_KEY' is not set"),
        };

        Ok(Config {
            testing_mode,
            anthropic_api_key,
            enabled_sources: parse_source_list(
                &std::env::var("ENABLED_SOURCES").unwrap_or_else(|_| DEFAULT_SOURCES.to_string()),
            ),
            sources_file: std::env::var("SOURCES_FILE").ok().map(PathBuf::from),
            scrape_timeout: Duration::from_secs(env_or("SCRAPE_TIMEOUT_SECS", 20)?),
            bus_subscriber_capacity: env_or("BUS_SUBSCRIBER_CAPACITY", 1024)?,
            broadcast_queue_capacity: env_or("BROADCAST_QUEUE_CAPACITY", 64)?,
            broadcast_send_timeout: Duration::from_millis(env_or(
                "BROADCAST_SEND_TIMEOUT_MS",
                5000,
            )?),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 2 * 1024 * 1024)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => bail!("'{other}' is not a boolean"),
    }
}

/// Splits a comma separated source list, dropping blanks and repeats.
fn parse_source_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
