//! Usage accumulation and cost estimation
//!
//! A [`UsageTracker`] is constructed once per client and shared by
//! reference with every component that records usage. It is the only
//! state the pipeline exposes for external inspection across calls.

use crate::models::response::Usage;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// USD rates per 1M tokens
#[derive(Debug, Clone, Copy)]
struct ModelPricing {
    input: f64,
    cache_read: f64,
    cache_write: f64,
    output: f64,
}

// Approximate published list prices. Keys are matched by longest
// substring, so "gpt-4o-mini-2024-07-18" resolves to "gpt-4o-mini".
static PRICING: Lazy<HashMap<&'static str, ModelPricing>> = Lazy::new(|| {
    let mut table = HashMap::new();
    let mut add = |key, input, cache_read, cache_write, output| {
        table.insert(
            key,
            ModelPricing {
                input,
                cache_read,
                cache_write,
                output,
            },
        );
    };
    add("gpt-4o", 2.5, 1.25, 0.0, 10.0);
    add("gpt-4o-mini", 0.15, 0.075, 0.0, 1.6);
    add("gpt-4-turbo", 10.0, 0.0, 0.0, 30.0);
    add("gpt-3.5", 1.5, 0.0, 0.0, 2.0);
    add("o1", 15.0, 7.5, 0.0, 60.0);
    add("o1-mini", 1.1, 0.55, 0.0, 4.4);
    add("o3-mini", 1.1, 0.55, 0.0, 4.4);
    add("claude-3-5-sonnet", 3.0, 0.3, 3.75, 15.0);
    add("claude-3-5-haiku", 0.8, 0.08, 1.0, 4.0);
    add("claude-3-opus", 15.0, 1.5, 18.75, 75.0);
    add("claude-3-haiku", 0.25, 0.025, 0.3, 1.25);
    add("gemini-2.5-pro", 1.25, 0.125, 0.0, 10.0);
    add("gemini-2.5-flash", 0.3, 0.03, 0.0, 2.5);
    add("grok-3", 3.0, 0.6, 0.0, 15.0);
    add("grok-3-mini", 0.3, 0.06, 0.0, 0.5);
    table
});

/// Resolve a pricing entry for a target identifier. Longest key wins so
/// the most specific model name matches first.
fn find_pricing(target: &str) -> Option<&'static ModelPricing> {
    let mut keys: Vec<&&str> = PRICING.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
    keys.into_iter()
        .find(|key| target.contains(**key))
        .and_then(|key| PRICING.get(key))
}

/// Estimate the USD cost of one response's usage against a target
pub fn estimate_cost(target: &str, usage: &Usage) -> f64 {
    let Some(rates) = find_pricing(target) else {
        return 0.0;
    };
    let fresh_input = usage.input_tokens.saturating_sub(usage.cache_read_input_tokens);
    (fresh_input as f64 * rates.input
        + usage.cache_read_input_tokens as f64 * rates.cache_read
        + usage.cache_creation_input_tokens as f64 * rates.cache_write
        + usage.output_tokens as f64 * rates.output)
        / 1_000_000.0
}

/// Point-in-time snapshot of accumulated usage
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    /// Fresh input tokens
    pub input_tokens: u64,
    /// Output tokens
    pub output_tokens: u64,
    /// Tokens served from cache (provider prompt cache or similarity cache)
    pub cache_read_tokens: u64,
    /// Tokens written to the provider prompt cache
    pub cache_creation_tokens: u64,
    /// Estimated USD cost
    pub cost_usd: f64,
    /// Number of recorded responses
    pub requests: u64,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Totals {
    input_tokens: u64,
    output_tokens: u64,
    cache_read_tokens: u64,
    cache_creation_tokens: u64,
    cost_usd: f64,
    requests: u64,
}

/// Shared usage accumulator. Each update happens under one lock so
/// concurrent recorders never lose counts.
#[derive(Debug, Default)]
pub struct UsageTracker {
    totals: Mutex<Totals>,
}

impl UsageTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage from a dispatched response, priced against its target
    pub fn record(&self, target: &str, usage: &Usage) {
        let cost = estimate_cost(target, usage);
        let mut totals = self.totals.lock().expect("usage tracker lock poisoned");
        totals.input_tokens += usage.input_tokens;
        totals.output_tokens += usage.output_tokens;
        totals.cache_read_tokens += usage.cache_read_input_tokens;
        totals.cache_creation_tokens += usage.cache_creation_input_tokens;
        totals.cost_usd += cost;
        totals.requests += 1;
        debug!(
            target_id = target,
            input = usage.input_tokens,
            output = usage.output_tokens,
            cost_usd = cost,
            "Recorded usage"
        );
    }

    /// Record a similarity-cache hit. The stored response's input tokens
    /// count as cache reads; nothing is billed and no cache-creation
    /// usage accrues.
    pub fn record_cache_hit(&self, usage: &Usage) {
        let mut totals = self.totals.lock().expect("usage tracker lock poisoned");
        totals.cache_read_tokens += usage.input_tokens + usage.cache_read_input_tokens;
        totals.requests += 1;
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> UsageSnapshot {
        let totals = self.totals.lock().expect("usage tracker lock poisoned");
        UsageSnapshot {
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            cache_read_tokens: totals.cache_read_tokens,
            cache_creation_tokens: totals.cache_creation_tokens,
            cost_usd: totals.cost_usd,
            requests: totals.requests,
            taken_at: Utc::now(),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        let mut totals = self.totals.lock().expect("usage tracker lock poisoned");
        *totals = Totals::default();
    }
}
