use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::info;

use crate::catalog::CatalogClient;
use crate::channels::ChannelStore;
use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Users granted admin rights for the lifetime of the process.
/// There is no revocation; the set only grows.
#[derive(Default)]
pub struct AdminSet {
    users: RwLock<HashSet<u64>>,
}

impl AdminSet {
    pub async fn grant(&self, user_id: u64) {
        if self.users.write().await.insert(user_id) {
            info!("Granted admin status to user {}", user_id);
        }
    }

    pub async fn contains(&self, user_id: u64) -> bool {
        self.users.read().await.contains(&user_id)
    }
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub channels: ChannelStore,
    pub admins: AdminSet,
    pub rate_limiter: RateLimiter,
    pub catalog: CatalogClient,
    /// The bot's own Telegram user id, for privilege checks in channels.
    pub bot_user_id: u64,
}

impl AppState {
    pub fn new(config: Config, channels: ChannelStore, bot_user_id: u64) -> Self {
        let rate_limiter =
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit_window());
        let catalog = CatalogClient::new(config.catalog.clone());
        Self {
            config,
            channels,
            admins: AdminSet::default(),
            rate_limiter,
            catalog,
            bot_user_id,
        }
    }
}
