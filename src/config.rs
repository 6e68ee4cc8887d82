use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./finance_session.db?mode=rwc";

/// Runtime settings, read once at startup after `.env` has been loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub database_url: String,
    pub http_timeout: Duration,
    pub log_dir: PathBuf,
    pub server_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let api_url = lookup("FINANCE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let http_timeout = match lookup("FINANCE_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::Config(format!("FINANCE_HTTP_TIMEOUT_SECS must be a number, got {raw:?}"))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(10),
        };

        let log_dir = lookup("FINANCE_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let server_addr = match lookup("FINANCE_SERVER_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::Config(format!("FINANCE_SERVER_ADDR is not a socket address: {raw:?}"))
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        Ok(Self {
            api_url,
            database_url,
            http_timeout,
            log_dir,
            server_addr,
        })
    }
}
