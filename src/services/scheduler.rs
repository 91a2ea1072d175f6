use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::execution::TradingEngine;

/// Run an analysis cycle every `interval_secs`, skipping ticks while paused.
pub async fn run_analysis_scheduler(
    engine: Arc<TradingEngine>,
    interval_secs: u64,
    pause_flag: Arc<AtomicBool>,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_secs, "Analysis scheduler started");

    loop {
        ticker.tick().await;

        if pause_flag.load(Ordering::Relaxed) {
            tracing::debug!("Analysis scheduler paused");
            continue;
        }

        // Failures are logged and counted inside the engine.
        let _ = engine.run_analysis_cycle().await;
    }
}
