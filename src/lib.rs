pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod middleware;
pub mod routes;
pub mod services;

use std::sync::Arc;

use tokio::sync::RwLock;

use config::Config;
use services::intervals::IntervalsService;
use services::strava::StravaBrokerService;
use services::telegram::TelegramService;
use services::wattattack::WattAttackService;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub wattattack: WattAttackService,
    /// Present only when a broker URL is configured; without it the Strava
    /// delivery channel is simply skipped.
    pub strava: Option<StravaBrokerService>,
    pub intervals: IntervalsService,
    /// Initialized after startup when a bot token is configured.
    pub telegram: Arc<RwLock<Option<TelegramService>>>,
}
