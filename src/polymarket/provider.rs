use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{Opportunity, Position, PriceUpdate};

use super::gamma_client::{GammaClient, MarketOrder};
use super::scanner::{scan_markets, MarketFeed, ScanRules};

/// Source of live prices and candidate markets.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current prices for held positions. Keys with no quote are simply absent.
    async fn refresh_prices(&self, positions: &[Position]) -> Result<Vec<PriceUpdate>, ProviderError>;

    async fn trending_opportunities(&self) -> Result<Vec<Opportunity>, ProviderError>;

    async fn new_opportunities(&self) -> Result<Vec<Opportunity>, ProviderError>;
}

/// Market data from the Polymarket Gamma API.
#[derive(Debug, Clone)]
pub struct GammaMarketData {
    client: GammaClient,
    rules: ScanRules,
    listing_limit: u32,
}

impl GammaMarketData {
    pub fn new(client: GammaClient) -> Self {
        Self {
            client,
            rules: ScanRules::default(),
            listing_limit: 50,
        }
    }

    async fn scan(&self, order: MarketOrder, feed: MarketFeed) -> Result<Vec<Opportunity>, ProviderError> {
        let markets = self.client.get_active_markets(order, self.listing_limit).await?;
        let opportunities = scan_markets(&markets, feed, &self.rules);

        tracing::debug!(
            feed = ?feed,
            markets = markets.len(),
            opportunities = opportunities.len(),
            "Scanned market listing"
        );

        Ok(opportunities)
    }
}

#[async_trait]
impl MarketDataProvider for GammaMarketData {
    async fn refresh_prices(&self, positions: &[Position]) -> Result<Vec<PriceUpdate>, ProviderError> {
        let mut ids: Vec<String> = positions.iter().map(|p| p.market_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let markets = self.client.get_markets_by_condition_ids(&ids).await?;

        let updates = positions
            .iter()
            .filter_map(|pos| {
                let market = markets.iter().find(|m| m.condition_id == pos.market_id)?;
                let price = market.price_of(&pos.outcome)?;
                Some(PriceUpdate {
                    market_id: pos.market_id.clone(),
                    outcome: pos.outcome.clone(),
                    price,
                })
            })
            .collect();

        Ok(updates)
    }

    async fn trending_opportunities(&self) -> Result<Vec<Opportunity>, ProviderError> {
        self.scan(MarketOrder::Volume24h, MarketFeed::Trending).await
    }

    async fn new_opportunities(&self) -> Result<Vec<Opportunity>, ProviderError> {
        self.scan(MarketOrder::StartDate, MarketFeed::New).await
    }
}
