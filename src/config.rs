use std::env;
use std::path::PathBuf;

use crate::rate_limit::RateLimitConfig;

pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
    /// Directory for the in-memory store's JSON snapshot; none keeps data in memory only.
    pub data_dir: Option<PathBuf>,
    pub rate_limit_enabled: bool,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters long");
        }
        Ok(Self {
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: optional("DATABASE_URL"),
            frontend_url: optional("FRONTEND_URL"),
            enable_hsts: flag("ENABLE_HSTS", false),
            data_dir: optional("DADPARS_DATA_DIR").map(PathBuf::from),
            rate_limit_enabled: flag("RL_ENABLED", true),
            rate_limit: RateLimitConfig::from_env(),
        })
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("dadpars.json"))
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
