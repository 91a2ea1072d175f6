use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clobster::api::router::create_router;
use clobster::config::AppConfig;
use clobster::db::{self, LedgerStore, MemoryLedger, PgLedger};
use clobster::execution::{EngineConfig, EntryRules, RandomSource, StdRandom, TradingEngine};
use clobster::intelligence::{LlmReasoner, ReasoningGenerator, TemplateReasoner};
use clobster::polymarket::{GammaClient, GammaMarketData, MarketDataProvider};
use clobster::services::run_analysis_scheduler;
use clobster::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = clobster::metrics::init_metrics()?;

    // --- Ledger ---
    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::init_pool(url).await?;
            tracing::info!("Database connected");
            Arc::new(PgLedger::new(pool, config.initial_balance))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory ledger (state is lost on restart)");
            Arc::new(MemoryLedger::new(config.initial_balance))
        }
    };

    // --- Collaborators ---
    let market: Arc<dyn MarketDataProvider> = Arc::new(GammaMarketData::new(
        GammaClient::with_base_url(&config.gamma_api_url),
    ));

    let reasoner: Arc<dyn ReasoningGenerator> = match &config.openai_api_key {
        Some(key) => {
            tracing::info!(model = %config.openai_model, "Using LLM reasoning");
            Arc::new(
                LlmReasoner::new(key.clone(), config.openai_model.clone())
                    .with_base_url(&config.openai_base_url),
            )
        }
        None => {
            tracing::info!("OPENAI_API_KEY not set, using template reasoning");
            Arc::new(TemplateReasoner)
        }
    };

    let rng: Box<dyn RandomSource> = match config.rng_seed {
        Some(seed) => {
            tracing::info!(seed, "Using seeded RNG");
            Box::new(StdRandom::seeded(seed))
        }
        None => Box::new(StdRandom::from_entropy()),
    };

    let engine_config = EngineConfig {
        entry: EntryRules {
            max_positions: config.max_positions,
            min_trade_size: config.min_trade_size,
            max_position_size: config.max_position_size,
            ..Default::default()
        },
        ..Default::default()
    };
    let engine = Arc::new(TradingEngine::new(
        store.clone(),
        market,
        reasoner,
        rng,
        engine_config,
    ));

    // --- Scheduler ---
    let pause_flag = Arc::new(AtomicBool::new(false));

    if config.scheduler_enabled {
        let engine = engine.clone();
        let pause_flag = pause_flag.clone();
        let interval_secs = config.analysis_interval_secs;
        tokio::spawn(async move {
            run_analysis_scheduler(engine, interval_secs, pause_flag).await;
        });
    } else {
        tracing::info!("Scheduler disabled (SCHEDULER_ENABLED=false)");
    }

    let state = AppState {
        engine,
        store,
        config,
        metrics_handle,
        pause_flag,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
