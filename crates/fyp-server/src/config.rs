use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use fyp_db::DEFAULT_BUSY_TIMEOUT;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub jwt_secret: String,
    pub sync_token: Option<String>,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub busy_timeout: Duration,
}

impl Config {
    /// Read configuration from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("FYP_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FYP_JWT_SECRET is unset or still a placeholder; it must match the login service's signing secret");
        }

        let sync_token = std::env::var("FYP_SYNC_TOKEN").ok().filter(|t| !t.is_empty());
        let db_path = std::env::var("FYP_DB_PATH").unwrap_or_else(|_| "fyp.db".into()).into();
        let host = std::env::var("FYP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("FYP_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("FYP_PORT must be a port number")?;
        let busy_timeout = std::env::var("FYP_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT);

        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            sync_token,
            db_path,
            addr,
            busy_timeout,
        })
    }
}
