use std::sync::Arc;

use crate::config::Config;
use crate::db::DbClient;
use crate::services::auth::TokenIssuer;
use crate::services::background_jobs::BackgroundJobManager;
use crate::services::whatsapp::WhatsAppClient;
use crate::Result;

/// Shared handler state; every field is cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub tokens: TokenIssuer,
    pub whatsapp: WhatsAppClient,
    pub jobs: BackgroundJobManager,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DbClient, config: Config) -> Result<Self> {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours);
        let whatsapp = WhatsAppClient::from_config(&config)?;
        let jobs = BackgroundJobManager::new(
            db.clone(),
            whatsapp.clone(),
            config.reminder_interval_seconds,
        );

        Ok(Self {
            db,
            tokens,
            whatsapp,
            jobs,
            config: Arc::new(config),
        })
    }

    /// State wired to unreachable backends, for router tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let config = Config::for_tests();
        let db = DbClient::new(&config.database_url, &config.redis_url)
            .expect("pool builds without connecting");
        Self::new(db, config).expect("test state")
    }
}
