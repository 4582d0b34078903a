use std::path::PathBuf;

use clap::Parser;

mod auth;
mod commands;
mod config;
mod content;
mod controllers;
mod db;
mod error;
mod id;
mod ingest;
mod models;
mod normalize;
mod policy;
mod types;

pub(crate) use error::ApiResult;

#[cfg(test)]
mod test_util;
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::Database;

/// A pastebin service: short shareable ids, token auth, and
/// content-negotiated responses.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // try to load .env, ignoring any errors
    _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let database = Database::connect(&config.database.url).await?;
    database.migrate().await?;

    commands::serve::run(config, database).await
}
