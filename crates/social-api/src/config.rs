use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

const DEFAULT_DB_PATH: &str = "social.db";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 9000;

/// Startup configuration. Built once and passed down; never re-read at runtime.
#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Read `SOCIAL_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("SOCIAL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            bail!("SOCIAL_JWT_SECRET must be set");
        }

        let db_path = lookup("SOCIAL_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let host = lookup("SOCIAL_HOST").unwrap_or_else(|| DEFAULT_HOST.into());
        let port = match lookup("SOCIAL_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("SOCIAL_PORT is not a valid port: {raw}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            host,
            port,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .with_context(|| format!("invalid listen address {addr}"))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<redacted>")
            .field("db_path", &self.db_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
