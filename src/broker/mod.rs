//! The LLM broker: a per-session gate that serializes provider calls,
//! trims `max_tokens` against the remaining quota, and accounts actual
//! usage.
//!
//! At most one provider call is in flight per session. Contending callers
//! queue FIFO on the gate; release wakes exactly one waiter. The broker
//! never refuses a call on estimate and never retries; it trims, accounts
//! truthfully, and reports canonical errors.

pub mod error;
pub mod provider;
pub mod quota;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use error::BrokerError;
pub use provider::{Message, Provider, ProviderFailure, ProviderReply, ProviderRequest};
pub use quota::{Catalog, Ledger, QuotaSnapshot, Usage, Weights};

/// The completion floor granted when the quota cannot cover any output.
/// A soft trim never becomes a denial.
pub const MIN_COMPLETION_TOKENS: u32 = 5;

/// Tunables for one broker session.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Used when the caller names no `max_tokens`.
    pub default_max_tokens: u32,
    /// Bound on the admission wait (`queue.max_wait`).
    pub queue_max_wait: Duration,
    /// Hard bound on one provider call (`request.timeout`).
    pub request_timeout: Duration,
    /// Fraction of the affordable output actually granted.
    pub safety_factor: f64,
    /// Starting quota in catalog units.
    pub initial_units: f64,
}

/// A caller's chat submission. Unset fields fall back to broker defaults.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub tools: Option<Value>,
    pub metadata: Option<Value>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: None,
            temperature: None,
            tools: None,
            metadata: None,
        }
    }
}

/// A completed chat call with its accounting metadata.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub content: String,
    pub model: String,
    pub usage: Usage,
    /// True whenever the broker changed the caller's requested bound.
    pub trim_applied: bool,
    pub effective_max_tokens: u32,
}

/// The per-session broker. Owns the gate and is the sole mutator of the
/// quota ledger.
pub struct Broker {
    gate: AsyncMutex<()>,
    ledger: std::sync::Mutex<Ledger>,
    catalog: Catalog,
    settings: BrokerSettings,
    provider: Arc<dyn Provider>,
    session_id: String,
    window_id: u64,
}

impl Broker {
    pub fn new(
        settings: BrokerSettings,
        catalog: Catalog,
        provider: Arc<dyn Provider>,
        session_id: String,
    ) -> Self {
        Self {
            gate: AsyncMutex::new(()),
            ledger: std::sync::Mutex::new(Ledger::new(settings.initial_units)),
            catalog,
            settings,
            provider,
            session_id,
            window_id: 1,
        }
    }

    /// A point-in-time quota view. Never blocks on the gate.
    pub fn quota_get(&self) -> QuotaSnapshot {
        QuotaSnapshot {
            remaining_units: self.ledger.lock().expect("ledger lock").remaining_units(),
            weights: self.catalog.default_weights(),
            window_id: self.window_id,
            session_id: self.session_id.clone(),
        }
    }

    /// Submit a chat call that nothing cancels.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BrokerError> {
        self.chat_with_cancel(request, CancellationToken::new()).await
    }

    /// Submit a chat call observing `cancel` on both sides of the gate:
    /// while queued it terminates the request without a provider call;
    /// after acquisition it cancels provider-side when supported, otherwise
    /// the call completes and its usage is accounted.
    pub async fn chat_with_cancel(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<ChatReply, BrokerError> {
        debug!(session = %self.session_id, "chat submitted");

        let _gate = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(session = %self.session_id, "cancelled while queued");
                return Err(BrokerError::CancelledBeforeStart);
            }
            acquired = timeout(self.settings.queue_max_wait, self.gate.lock()) => match acquired {
                Ok(guard) => guard,
                Err(_) => {
                    debug!(session = %self.session_id, "admission wait exceeded");
                    return Err(BrokerError::QueueTimeout);
                }
            },
        };
        debug!(session = %self.session_id, "gate acquired");

        let model =
            request.model.clone().unwrap_or_else(|| self.catalog.default_model().to_owned());
        let weights = self.catalog.weights_for(&model);
        let requested = request.max_tokens.unwrap_or(self.settings.default_max_tokens);
        let (effective, trim_applied) = self.trim(requested, &weights);
        if trim_applied {
            debug!(requested, effective, "max_tokens trimmed");
        }

        let provider_request = ProviderRequest {
            model: model.clone(),
            messages: request.messages,
            max_tokens: effective,
            temperature: request.temperature,
            tools: request.tools,
            metadata: request.metadata,
        };

        let mut call = Box::pin(self.provider.chat(provider_request));
        let deadline = tokio::time::sleep(self.settings.request_timeout);
        tokio::pin!(deadline);
        let mut cancel_requested = false;

        let result = loop {
            tokio::select! {
                res = &mut call => break res,
                _ = &mut deadline => {
                    // dropping the call terminates it; no usage was reported
                    debug!(session = %self.session_id, "provider timeout");
                    return Err(BrokerError::ProviderTimeout);
                }
                _ = cancel.cancelled(), if !cancel_requested => {
                    if self.provider.supports_cancel() {
                        debug!(session = %self.session_id, "cancelled in flight, provider cancel");
                        return Err(BrokerError::CancelledAfterStart);
                    }
                    // the provider cannot cancel; let the call finish and
                    // account whatever it reports
                    cancel_requested = true;
                }
            }
        };

        match result {
            Ok(reply) => {
                self.deduct(&reply.usage, &weights);
                if cancel_requested {
                    Err(BrokerError::CancelledAfterStart)
                } else {
                    Ok(ChatReply {
                        content: reply.content,
                        model: reply.model,
                        usage: reply.usage,
                        trim_applied,
                        effective_max_tokens: effective,
                    })
                }
            }
            Err(failure) => {
                // partial success may still report usage; account it
                if let Some(usage) = &failure.usage {
                    self.deduct(usage, &weights);
                }
                if cancel_requested {
                    Err(BrokerError::CancelledAfterStart)
                } else {
                    warn!(subcode = %failure.subcode, "provider error");
                    Err(BrokerError::ProviderError {
                        subcode: failure.subcode,
                        message: failure.message,
                    })
                }
            }
        }
    }

    /// `safe_out = floor(remaining / w_out · safety_factor · 10^6)`, with
    /// the 5-token floor when the quota affords nothing.
    fn trim(&self, requested: u32, weights: &Weights) -> (u32, bool) {
        let remaining = self.ledger.lock().expect("ledger lock").remaining_units();
        let safe_out = ((remaining / weights.output) * self.settings.safety_factor * 1_000_000.0)
            .floor() as i64;

        if safe_out <= 0 {
            warn!(remaining, "quota exhausted, granting minimum completion");
            (MIN_COMPLETION_TOKENS, true)
        } else if i64::from(requested) > safe_out {
            (safe_out as u32, true)
        } else {
            (requested, false)
        }
    }

    fn deduct(&self, usage: &Usage, weights: &Weights) {
        let mut ledger = self.ledger.lock().expect("ledger lock");
        let applied = ledger.deduct(usage, weights);
        info!(
            prompt = usage.prompt_tokens,
            cached = usage.cached_tokens,
            completion = usage.completion_tokens,
            cost = applied,
            remaining = ledger.remaining_units(),
            "usage accounted"
        );
    }
}
