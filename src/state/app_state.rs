use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::security_config::SecurityConfig;
use crate::config::{AppConfig, MediaConfig};
use crate::engine::GameRegistry;
use crate::mailer::Mailer;
use crate::ws::hub::WsRegistry;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub security: SecurityConfig,
    pub media: MediaConfig,
    pub public_base_url: String,
    /// Socket registry: connection, user, and game-subscription indexes.
    pub hub: Arc<WsRegistry>,
    /// Live game workers keyed by game id.
    pub games: Arc<GameRegistry>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let hub = Arc::new(WsRegistry::new());
        let games = GameRegistry::new(db.clone(), hub.clone());
        Self {
            db,
            security: SecurityConfig::new(config.jwt_secret.as_bytes(), config.session_ttl_days),
            media: config.media.clone(),
            public_base_url: config.public_base_url.clone(),
            hub,
            games,
            mailer,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
