//! Runtime configuration read from `FINANCE_*` environment variables.

use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:financas.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub cors_origin: String,
    /// Replaces the embedded vocabulary tables when set
    pub vocabulary_path: Option<PathBuf>,
    /// Emit the `<field>_portugues` companion key in responses
    pub emit_portugues_keys: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            vocabulary_path: None,
            emit_portugues_keys: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let emit_portugues_keys = match read("FINANCE_EMIT_PORTUGUES_KEYS") {
            None => defaults.emit_portugues_keys,
            Some(raw) => parse_flag(&raw)?,
        };

        Ok(Self {
            database_url: read("FINANCE_DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: read("FINANCE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            cors_origin: read("FINANCE_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            vocabulary_path: read("FINANCE_VOCABULARY_PATH").map(PathBuf::from),
            emit_portugues_keys,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("FINANCE_EMIT_PORTUGUES_KEYS must be true or false, got '{}'", other),
    }
}
