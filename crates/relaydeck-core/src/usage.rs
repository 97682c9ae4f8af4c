//! Token/cost accounting across heterogeneous billing schemes.
//!
//! Chat providers bill per token at family-specific rates; media tools
//! bill a flat amount per call. Rates are a static table: close enough
//! for dashboard cost attribution, not an invoice.

use relaydeck_schema::UsageRecord;

struct Rate {
    provider: &'static str,
    /// Empty fragment is the provider's default row.
    model_fragment: &'static str,
    usd_per_1k_tokens: f64,
}

// More specific fragments come before broader ones; first match wins.
const RATES: &[Rate] = &[
    Rate { provider: "anthropic", model_fragment: "claude-3-5-haiku", usd_per_1k_tokens: 0.002 },
    Rate { provider: "anthropic", model_fragment: "claude-3-5-sonnet", usd_per_1k_tokens: 0.009 },
    Rate { provider: "anthropic", model_fragment: "claude-3-opus", usd_per_1k_tokens: 0.045 },
    Rate { provider: "anthropic", model_fragment: "", usd_per_1k_tokens: 0.008 },
    Rate { provider: "openai", model_fragment: "gpt-4o-mini", usd_per_1k_tokens: 0.0004 },
    Rate { provider: "openai", model_fragment: "gpt-4o", usd_per_1k_tokens: 0.0063 },
    Rate { provider: "openai", model_fragment: "", usd_per_1k_tokens: 0.005 },
    Rate { provider: "google", model_fragment: "gemini-1.5-flash", usd_per_1k_tokens: 0.0003 },
    Rate { provider: "google", model_fragment: "gemini-1.5-pro", usd_per_1k_tokens: 0.0044 },
    Rate { provider: "google", model_fragment: "", usd_per_1k_tokens: 0.002 },
    Rate { provider: "groq", model_fragment: "", usd_per_1k_tokens: 0.0008 },
    Rate { provider: "together", model_fragment: "", usd_per_1k_tokens: 0.0009 },
    Rate { provider: "openrouter", model_fragment: "", usd_per_1k_tokens: 0.003 },
];

const DEFAULT_RATE: f64 = 0.002;

// Per-call unit costs for tools that bill per invocation rather than per
// token. Local tools cost nothing.
const TOOL_UNIT_COSTS: &[(&str, f64)] = &[("generate_image", 0.04), ("web_search", 0.005)];

/// USD per 1K tokens for a provider/model pair.
pub fn provider_rate(provider: &str, model: &str) -> f64 {
    let model = model.to_lowercase();
    RATES
        .iter()
        .find(|rate| {
            rate.provider == provider
                && (rate.model_fragment.is_empty() || model.contains(rate.model_fragment))
        })
        .map(|rate| rate.usd_per_1k_tokens)
        .unwrap_or(DEFAULT_RATE)
}

/// Flat per-call cost of a tool; zero for anything not in the table.
pub fn tool_unit_cost(tool_id: &str) -> f64 {
    TOOL_UNIT_COSTS
        .iter()
        .find(|(id, _)| *id == tool_id)
        .map(|(_, cost)| *cost)
        .unwrap_or(0.0)
}

/// Per-turn accumulator. Local to one orchestration run's call stack,
/// never shared.
#[derive(Default)]
pub struct UsageAccountant {
    record: UsageRecord,
}

impl UsageAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed provider call; returns the cost of this call.
    pub fn account(&mut self, tokens: u64, provider: &str, model: &str) -> f64 {
        let cost = (tokens as f64 / 1000.0) * provider_rate(provider, model);
        self.record.add_call(tokens, cost);
        cost
    }

    /// Record one per-call billed tool invocation; returns its flat cost.
    pub fn account_tool(&mut self, tool_id: &str) -> f64 {
        let cost = tool_unit_cost(tool_id);
        if cost > 0.0 {
            self.record.add_flat(cost);
        }
        cost
    }

    pub fn record(&self) -> UsageRecord {
        self.record
    }
}
