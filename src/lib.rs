pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod execution;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::LedgerStore;
use crate::execution::TradingEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TradingEngine>,
    pub store: Arc<dyn LedgerStore>,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Pauses scheduled and cron-triggered cycles.
    pub pause_flag: Arc<AtomicBool>,
}
