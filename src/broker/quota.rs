//! Quota ledger and pricing catalog.
//!
//! Units are the pricing catalog's currency: USD per million tokens. The
//! ledger only ever decreases and clamps at zero; the broker is its sole
//! mutator.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

/// Per-million-token prices for one model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Weights {
    pub input: f64,
    pub cached: f64,
    pub output: f64,
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub cached_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    /// Cost of this usage under the given weights, in units.
    pub fn cost(&self, weights: &Weights) -> f64 {
        (self.prompt_tokens as f64 * weights.input
            + self.cached_tokens as f64 * weights.cached
            + self.completion_tokens as f64 * weights.output)
            / 1_000_000.0
    }
}

/// Model id -> weights, with a default model for unpriced ids.
#[derive(Debug, Clone)]
pub struct Catalog {
    models: BTreeMap<String, Weights>,
    default_model: String,
    default_weights: Weights,
}

impl Catalog {
    /// `models` must price the default model; a catalog that cannot price
    /// its own default is a construction error.
    pub fn new(models: BTreeMap<String, Weights>, default_model: String) -> Option<Self> {
        let default_weights = *models.get(&default_model)?;
        Some(Self { models, default_model, default_weights })
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn default_weights(&self) -> Weights {
        self.default_weights
    }

    /// Weights for a model id. Unknown ids price as the default model; the
    /// broker never refuses a call over pricing.
    pub fn weights_for(&self, model: &str) -> Weights {
        match self.models.get(model) {
            Some(w) => *w,
            None => {
                warn!(model, default = %self.default_model, "model not in catalog, pricing as default");
                self.default_weights
            }
        }
    }
}

/// Remaining units for one session. Non-increasing, clamped at zero.
#[derive(Debug)]
pub struct Ledger {
    remaining_units: f64,
}

impl Ledger {
    pub fn new(initial_units: f64) -> Self {
        Self { remaining_units: initial_units.max(0.0) }
    }

    pub fn remaining_units(&self) -> f64 {
        self.remaining_units
    }

    /// Deduct the cost of `usage`; returns the amount actually deducted.
    pub fn deduct(&mut self, usage: &Usage, weights: &Weights) -> f64 {
        let cost = usage.cost(weights);
        let applied = cost.min(self.remaining_units);
        self.remaining_units = (self.remaining_units - cost).max(0.0);
        applied
    }
}

/// A point-in-time view of the quota, safe to hand to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaSnapshot {
    pub remaining_units: f64,
    pub weights: Weights,
    pub window_id: u64,
    pub session_id: String,
}
