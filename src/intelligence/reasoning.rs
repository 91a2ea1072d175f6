use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::models::TradeAction;

use super::stats::Stats;

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are Clobster, a paper-trading agent on Polymarket. \
Explain the trade you just made in two short sentences, first person, plain text, \
no hashtags, no emojis. Mention the price and the one or two facts that mattered most.";

/// Everything a narrator may draw on when explaining a trade.
#[derive(Debug, Clone, Default)]
pub struct ReasoningContext {
    pub stats: Option<Stats>,
    /// Realized P&L of a closing trade.
    pub realized_pnl: Option<Decimal>,
    /// Exit trigger label for a closing trade.
    pub exit_reason: Option<String>,
    /// Qualifying reasons attached to an opportunity.
    pub entry_reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub action: TradeAction,
    pub market_title: String,
    pub outcome: String,
    pub price: Decimal,
    pub context: ReasoningContext,
}

/// Produces the human-readable narrative appended to the thought log.
///
/// Implementations must not fail: `None` means "nothing to say" and the
/// trade is recorded without a thought.
#[async_trait]
pub trait ReasoningGenerator: Send + Sync {
    async fn explain(&self, request: &ReasoningRequest) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Template narrator
// ---------------------------------------------------------------------------

/// Deterministic narrator built from the structured context alone.
#[derive(Debug, Clone, Default)]
pub struct TemplateReasoner;

#[async_trait]
impl ReasoningGenerator for TemplateReasoner {
    async fn explain(&self, request: &ReasoningRequest) -> Option<String> {
        Some(render_template(request))
    }
}

pub fn render_template(request: &ReasoningRequest) -> String {
    let ctx = &request.context;
    let price = request.price.round_dp(3);

    let mut text = match request.action {
        TradeAction::Buy => {
            let why = if ctx.entry_reasons.is_empty() {
                "the setup looked right".to_string()
            } else {
                ctx.entry_reasons.join(", ")
            };
            format!(
                "Bought {} on \"{}\" at {}: {}.",
                request.outcome, request.market_title, price, why
            )
        }
        TradeAction::Sell => {
            let pnl = ctx.realized_pnl.unwrap_or(Decimal::ZERO).round_dp(2);
            let reason = ctx.exit_reason.as_deref().unwrap_or("rebalancing");
            format!(
                "Sold {} on \"{}\" at {} for {}${} ({}).",
                request.outcome,
                request.market_title,
                price,
                if pnl.is_sign_negative() { "-" } else { "+" },
                pnl.abs(),
                reason
            )
        }
    };

    if let Some(stats) = &ctx.stats {
        text.push_str(&format!(
            " Realized P&L {} over {}W/{}L ({}% win rate), {} open.",
            stats.total_pnl.round_dp(2),
            stats.wins,
            stats.losses,
            stats.win_rate,
            stats.active_positions
        ));
    }

    text
}

// ---------------------------------------------------------------------------
// Chat-completion narrator
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Narrator backed by an OpenAI-compatible chat completions endpoint.
/// Any failure falls back to the template narrative.
#[derive(Debug, Clone)]
pub struct LlmReasoner {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl LlmReasoner {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url: DEFAULT_OPENAI_BASE.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn user_prompt(request: &ReasoningRequest) -> String {
        let ctx = &request.context;
        let mut prompt = format!(
            "Action: {}\nMarket: {}\nOutcome: {}\nPrice: {}\n",
            request.action,
            request.market_title,
            request.outcome,
            request.price.round_dp(3)
        );
        if let Some(reason) = &ctx.exit_reason {
            prompt.push_str(&format!("Exit trigger: {reason}\n"));
        }
        if let Some(pnl) = ctx.realized_pnl {
            prompt.push_str(&format!("Realized P&L: ${}\n", pnl.round_dp(2)));
        }
        if !ctx.entry_reasons.is_empty() {
            prompt.push_str(&format!("Signals: {}\n", ctx.entry_reasons.join("; ")));
        }
        if let Some(stats) = &ctx.stats {
            prompt.push_str(&format!(
                "Balance: ${} (started ${})\nRealized P&L to date: ${}\nWin rate: {}% ({}W/{}L)\n",
                stats.balance.round_dp(2),
                stats.initial_balance.round_dp(2),
                stats.total_pnl.round_dp(2),
                stats.win_rate,
                stats.wins,
                stats.losses
            ));
        }
        prompt
    }

    async fn complete(&self, request: &ReasoningRequest) -> anyhow::Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0.8,
            "max_tokens": 120,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(request) },
            ],
        });

        let resp: ChatResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("empty completion"))
    }
}

#[async_trait]
impl ReasoningGenerator for LlmReasoner {
    async fn explain(&self, request: &ReasoningRequest) -> Option<String> {
        match self.complete(request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "Reasoning completion failed, using template");
                Some(render_template(request))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
