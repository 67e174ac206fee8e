use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub wattattack: WattAttackConfig,
    pub strava: StravaConfig,
    pub intervals: IntervalsConfig,
    pub schedule: ScheduleConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Token of the client-facing bot. When absent, Telegram delivery is
    /// skipped and the reconciliation loop only records ledger rows.
    pub bot_token: Option<String>,
    /// Chat that receives admin notifications (upcoming assignments,
    /// unattributed activities).
    pub admin_chat_id: Option<String>,
}

/// One WattAttack platform account. An account is nominally parked at one or
/// more physical stands; the stand list drives activity attribution.
#[derive(Debug, Clone, Deserialize)]
pub struct WattAttackAccount {
    pub account_id: String,
    pub email: String,
    pub password: String,
    pub stand_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WattAttackConfig {
    pub base_url: String,
    /// Accounts are configured as a JSON array in `WATTATTACK_ACCOUNTS`.
    pub accounts: Vec<WattAttackAccount>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StravaConfig {
    /// Base URL of the Strava-brokering service (connection status + upload).
    pub broker_url: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalsConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Margin added on both ends of a slot window when matching activities.
    pub grace_minutes: i64,
    /// How long to wait for a FIT file before processing an activity as file-less.
    pub fit_wait_seconds: i64,
    /// Local timezone as a fixed UTC offset (Europe/Moscow = +3).
    pub utc_offset_hours: i32,
    /// Root directory for archived FIT files (one subdirectory per account).
    pub fit_dir: String,
    /// Auto-assignment: how far ahead of a reservation's start to act.
    pub assignment_lead_minutes: i64,
    /// Auto-assignment: width of the query window past the lead time.
    pub assignment_window_minutes: i64,
    /// When true, the auto-assignment loop only notifies and never mutates
    /// platform profiles.
    pub assignment_observe_only: bool,
    /// Reconciliation tick period.
    pub reconcile_interval_seconds: u64,
    /// Auto-assignment tick period.
    pub assignment_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for the admin API
    pub admin_per_second: u32,
    /// Burst size for the admin API
    pub admin_burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let accounts_json = env::var("WATTATTACK_ACCOUNTS").unwrap_or_else(|_| "[]".to_string());
        let accounts: Vec<WattAttackAccount> = serde_json::from_str(&accounts_json)
            .map_err(|_| ConfigError::InvalidValue("WATTATTACK_ACCOUNTS".to_string()))?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/krutilka.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            telegram: TelegramConfig {
                bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
                admin_chat_id: env::var("TELEGRAM_ADMIN_CHAT_ID").ok(),
            },
            wattattack: WattAttackConfig {
                base_url: env::var("WATTATTACK_BASE_URL")
                    .unwrap_or_else(|_| "https://wattattack.com/api".to_string()),
                accounts,
                timeout_seconds: env::var("WATTATTACK_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            strava: StravaConfig {
                broker_url: env::var("STRAVA_BROKER_URL").ok(),
                timeout_seconds: env::var("STRAVA_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            intervals: IntervalsConfig {
                base_url: env::var("INTERVALS_BASE_URL")
                    .unwrap_or_else(|_| "https://intervals.icu".to_string()),
                timeout_seconds: env::var("INTERVALS_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            schedule: ScheduleConfig {
                grace_minutes: env::var("SCHEDULE_GRACE_MINUTES")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                fit_wait_seconds: env::var("SCHEDULE_FIT_WAIT_SECONDS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
                utc_offset_hours: env::var("SCHEDULE_UTC_OFFSET_HOURS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                fit_dir: env::var("SCHEDULE_FIT_DIR").unwrap_or_else(|_| "data/fit".to_string()),
                assignment_lead_minutes: env::var("SCHEDULE_ASSIGNMENT_LEAD_MINUTES")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
                assignment_window_minutes: env::var("SCHEDULE_ASSIGNMENT_WINDOW_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .unwrap_or(15),
                assignment_observe_only: match env::var("SCHEDULE_ASSIGNMENT_OBSERVE_ONLY") {
                    Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
                    Err(_) => false,
                },
                reconcile_interval_seconds: env::var("SCHEDULE_RECONCILE_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                assignment_interval_seconds: env::var("SCHEDULE_ASSIGNMENT_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },
            rate_limit: RateLimitConfig {
                admin_per_second: env::var("RATE_LIMIT_ADMIN_PER_SECOND")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                admin_burst: env::var("RATE_LIMIT_ADMIN_BURST")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .unwrap_or(50),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/krutilka.db".to_string(),
                max_connections: 5,
            },
            telegram: TelegramConfig {
                bot_token: None,
                admin_chat_id: None,
            },
            wattattack: WattAttackConfig {
                base_url: "https://wattattack.com/api".to_string(),
                accounts: Vec::new(),
                timeout_seconds: 30,
            },
            strava: StravaConfig {
                broker_url: None,
                timeout_seconds: 30,
            },
            intervals: IntervalsConfig {
                base_url: "https://intervals.icu".to_string(),
                timeout_seconds: 30,
            },
            schedule: ScheduleConfig {
                grace_minutes: 30,
                fit_wait_seconds: 600,
                utc_offset_hours: 3,
                fit_dir: "data/fit".to_string(),
                assignment_lead_minutes: 20,
                assignment_window_minutes: 15,
                assignment_observe_only: false,
                reconcile_interval_seconds: 300,
                assignment_interval_seconds: 60,
            },
            rate_limit: RateLimitConfig {
                admin_per_second: 10,
                admin_burst: 50,
            },
        }
    }
}
