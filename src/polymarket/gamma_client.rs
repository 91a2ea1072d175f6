use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

#[derive(Debug, Error)]
pub enum GammaClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GammaEvent {
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GammaMarket {
    #[serde(alias = "conditionId")]
    pub condition_id: String,
    pub question: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub events: Vec<GammaEvent>,
    /// JSON array of outcome labels, e.g. ["Yes","No"] or ["G2 Esports","Karmine Corp"]
    #[serde(default)]
    pub outcomes: Option<String>,
    /// Stringified JSON array of prices aligned with `outcomes`, e.g. "[\"0.62\", \"0.38\"]"
    #[serde(default, alias = "outcomePrices")]
    pub outcome_prices: Option<String>,
    #[serde(default, alias = "volume24hr")]
    pub volume_24hr: Option<Decimal>,
    #[serde(default, alias = "liquidityNum")]
    pub liquidity_num: Option<Decimal>,
    /// Absolute change of the first outcome's price over 24h.
    #[serde(default, alias = "oneDayPriceChange")]
    pub one_day_price_change: Option<Decimal>,
}

impl GammaMarket {
    /// Parse the stringified outcome labels.
    pub fn parse_outcomes(&self) -> Vec<String> {
        self.outcomes
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_default()
    }

    /// Parse the stringified outcome prices. Unparseable entries are dropped
    /// together with everything after them so indices stay aligned.
    pub fn parse_outcome_prices(&self) -> Vec<Decimal> {
        self.outcome_prices
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_default()
            .iter()
            .map_while(|p| Decimal::from_str(p.trim()).ok())
            .collect()
    }

    /// `(outcome, price)` pairs.
    pub fn outcome_quotes(&self) -> Vec<(String, Decimal)> {
        self.parse_outcomes()
            .into_iter()
            .zip(self.parse_outcome_prices())
            .collect()
    }

    pub fn price_of(&self, outcome: &str) -> Option<Decimal> {
        self.outcome_quotes()
            .into_iter()
            .find(|(o, _)| o.eq_ignore_ascii_case(outcome))
            .map(|(_, p)| p)
    }

    /// Get the event-level slug (for polymarket.com/event/{slug} URLs).
    /// Falls back to the market-level slug if no event slug is available.
    pub fn event_slug(&self) -> Option<&str> {
        self.events
            .first()
            .and_then(|e| e.slug.as_deref())
            .or(self.slug.as_deref())
    }
}

/// Sort key accepted by the Gamma `/markets` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketOrder {
    Volume24h,
    StartDate,
}

impl MarketOrder {
    fn as_param(&self) -> &'static str {
        match self {
            MarketOrder::Volume24h => "volume24hr",
            MarketOrder::StartDate => "startDate",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaClient {
    pub fn new() -> Self {
        Self::with_base_url(GAMMA_API_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch open markets sorted descending by `order`.
    pub async fn get_active_markets(
        &self,
        order: MarketOrder,
        limit: u32,
    ) -> Result<Vec<GammaMarket>, GammaClientError> {
        let url = format!(
            "{}/markets?active=true&closed=false&order={}&ascending=false&limit={}",
            self.base_url,
            order.as_param(),
            limit
        );
        self.fetch_markets(&url).await
    }

    /// Fetch markets by condition ID.
    pub async fn get_markets_by_condition_ids(
        &self,
        condition_ids: &[String],
    ) -> Result<Vec<GammaMarket>, GammaClientError> {
        if condition_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = condition_ids
            .iter()
            .map(|id| format!("condition_ids={id}"))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}/markets?{}&limit={}", self.base_url, ids, condition_ids.len());
        self.fetch_markets(&url).await
    }

    async fn fetch_markets(&self, url: &str) -> Result<Vec<GammaMarket>, GammaClientError> {
        let resp = self.http.get(url).send().await?.error_for_status()?;

        let body = resp.text().await?;
        serde_json::from_str::<Vec<GammaMarket>>(&body)
            .map_err(|e| GammaClientError::Unexpected(format!("markets payload: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
