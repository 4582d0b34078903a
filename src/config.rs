use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    pub max_upload_size: usize,
}

impl Config {
    /// Load configuration from an optional TOML file with `TEXTBIN`
    /// environment overrides (e.g. `TEXTBIN__DATABASE__URL`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .set_default("base_url", "http://localhost:3010")?
            .set_default("port", 3010)?
            .set_default("database.url", "sqlite://textbin.db?mode=rwc")?
            .set_default("limits.max_upload_size", 10 * 1024 * 1024_i64)?
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("TEXTBIN").separator("__"))
            .build()
            .context("failed to read config")?
            .try_deserialize()
            .context("failed to deserialize config")
    }

    /// Shareable URL for a paste.
    pub fn paste_url(&self, id: &str) -> String {
        format!("{}/{id}", self.base_url.trim_end_matches('/'))
    }
}
