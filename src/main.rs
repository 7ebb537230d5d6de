mod admin;
mod bot;
mod catalog;
mod channels;
mod config;
mod error;
mod markup;
mod membership;
mod platform;
mod rate_limit;
mod reward;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::channels::ChannelStore;
use crate::config::Config;
use crate::state::AppState;

const CONFIG_PATH_ENV: &str = "BOOKBOT_CONFIG";

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bookbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!("Failed to start bot: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // A missing .env is fine; the variables may come from the environment
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Channels file: {}", config.storage.channels_file.display());
    info!("  Catalog: {}", config.catalog.base_url);
    info!(
        "  Rate limit: {} requests / {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );

    let channels = ChannelStore::load(config.storage.channels_file.clone()).await;

    let bot = Bot::new(&config.telegram.bot_token);
    let me = bot
        .get_me()
        .await
        .context("Failed to fetch bot identity from Telegram")?;
    info!("Authorized as @{} ({})", me.username(), me.id.0);

    let state = Arc::new(AppState::new(config, channels, me.id.0));

    info!("Bot is starting...");
    platform::telegram::run(state, bot).await?;

    Ok(())
}
