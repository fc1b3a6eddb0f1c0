use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub session_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_secret = var("WARBLER_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("WARBLER_SESSION_SECRET is unset or still a placeholder");
        }

        let db_path = var("WARBLER_DB_PATH").unwrap_or_else(|| "warbler.db".into());
        let host = var("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("WARBLER_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("WARBLER_PORT is not a port number")?;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("WARBLER_HOST is not an IP address")?;

        Ok(Self {
            db_path: db_path.into(),
            addr,
            session_secret,
        })
    }
}
