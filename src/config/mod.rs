use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::polymarket::gamma_client::GAMMA_API_BASE;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// In-memory ledger when unset.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,

    // Account and sizing
    pub initial_balance: Decimal,
    pub max_position_size: Decimal,
    pub max_positions: usize,
    pub min_trade_size: Decimal,

    // Scheduling
    pub analysis_interval_secs: u64,
    pub scheduler_enabled: bool,
    pub rng_seed: Option<u64>,

    // Market data
    pub gamma_api_url: String,

    // Reasoning (template narrator when no key)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,

    // Auth (disabled when unset)
    pub api_token: Option<String>,
    pub cron_secret: Option<String>,

    // Dashboard
    pub dashboard_trades_limit: i64,
    pub dashboard_thoughts_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            initial_balance: parse_or("INITIAL_BALANCE", Decimal::from(1_500)),
            max_position_size: parse_or("MAX_POSITION_SIZE", Decimal::from(200)),
            max_positions: parse_or("MAX_POSITIONS", 10),
            min_trade_size: parse_or("MIN_TRADE_SIZE", Decimal::from(30)),

            analysis_interval_secs: parse_or("ANALYSIS_INTERVAL_SECS", 120),
            scheduler_enabled: parse_or("SCHEDULER_ENABLED", true),
            rng_seed: non_empty("RNG_SEED").and_then(|s| s.parse().ok()),

            gamma_api_url: env::var("GAMMA_API_URL").unwrap_or_else(|_| GAMMA_API_BASE.into()),

            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.into()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.into()),

            api_token: non_empty("API_TOKEN"),
            cron_secret: non_empty("CRON_SECRET"),

            dashboard_trades_limit: parse_or("DASHBOARD_TRADES_LIMIT", 20),
            dashboard_thoughts_limit: parse_or("DASHBOARD_THOUGHTS_LIMIT", 10),
        })
    }

    /// Defaults for everything, no database, no auth. Used by tests.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            initial_balance: Decimal::from(1_500),
            max_position_size: Decimal::from(200),
            max_positions: 10,
            min_trade_size: Decimal::from(30),
            analysis_interval_secs: 120,
            scheduler_enabled: false,
            rng_seed: Some(7),
            gamma_api_url: GAMMA_API_BASE.into(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            api_token: None,
            cron_secret: None,
            dashboard_trades_limit: 20,
            dashboard_thoughts_limit: 10,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
