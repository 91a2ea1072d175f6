pub mod gamma_client;
pub mod provider;
pub mod scanner;

pub use gamma_client::GammaClient;
pub use provider::{GammaMarketData, MarketDataProvider};
pub use scanner::{MarketFeed, ScanRules};
