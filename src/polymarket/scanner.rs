use rust_decimal::Decimal;

use crate::models::Opportunity;

use super::gamma_client::GammaMarket;

/// Which listing a market came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketFeed {
    Trending,
    New,
}

/// Thresholds for turning raw markets into opportunities.
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Outcomes priced below this are ignored.
    pub min_price: Decimal,
    /// Outcomes priced above this are ignored.
    pub max_price: Decimal,
    pub high_volume_24h: Decimal,
    /// Minimum absolute 24h move, in price units.
    pub big_move: Decimal,
    pub long_shot_price: Decimal,
    pub long_shot_min_liquidity: Decimal,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            min_price: Decimal::new(10, 2),              // 0.10
            max_price: Decimal::new(85, 2),              // 0.85
            high_volume_24h: Decimal::from(10_000),
            big_move: Decimal::new(5, 2),                // 0.05
            long_shot_price: Decimal::new(30, 2),        // 0.30
            long_shot_min_liquidity: Decimal::from(5_000),
        }
    }
}

/// Qualifying reasons for one outcome of a market. Empty means "not a candidate".
pub fn qualify(market: &GammaMarket, price: Decimal, feed: MarketFeed, rules: &ScanRules) -> Vec<String> {
    if price < rules.min_price || price > rules.max_price {
        return Vec::new();
    }

    let mut reasons = Vec::new();

    if let Some(volume) = market.volume_24hr {
        if volume >= rules.high_volume_24h {
            reasons.push(format!("high 24h volume (${})", volume.round_dp(0)));
        }
    }

    if let Some(change) = market.one_day_price_change {
        if change.abs() >= rules.big_move {
            let points = (change * Decimal::ONE_HUNDRED).round_dp(1);
            reasons.push(format!("moved {points} points in 24h"));
        }
    }

    if feed == MarketFeed::New {
        reasons.push("fresh listing".to_string());
    }

    let liquidity = market.liquidity_num.unwrap_or(Decimal::ZERO);
    if price < rules.long_shot_price && liquidity >= rules.long_shot_min_liquidity {
        reasons.push("long-shot value".to_string());
    }

    reasons
}

/// Turn a market listing into opportunities: at most one outcome per market
/// (the one with the most reasons, first listed on ties), strongest first.
pub fn scan_markets(markets: &[GammaMarket], feed: MarketFeed, rules: &ScanRules) -> Vec<Opportunity> {
    let mut opportunities: Vec<Opportunity> = markets
        .iter()
        .filter_map(|market| {
            let (outcome, price, reasons) = market
                .outcome_quotes()
                .into_iter()
                .map(|(outcome, price)| {
                    let reasons = qualify(market, price, feed, rules);
                    (outcome, price, reasons)
                })
                .filter(|(_, _, reasons)| !reasons.is_empty())
                .reduce(|best, cand| if cand.2.len() > best.2.len() { cand } else { best })?;

            Some(Opportunity {
                market_id: market.condition_id.clone(),
                market_slug: market.event_slug().unwrap_or_default().to_string(),
                market_title: market.question.clone(),
                outcome,
                price,
                reasons,
            })
        })
        .collect();

    // Stable: equal reason counts keep listing order
    opportunities.sort_by(|a, b| b.reasons.len().cmp(&a.reasons.len()));
    opportunities
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
