//! The provider seam. The HTTP client behind it is out of scope; the broker
//! only needs this contract.

use async_trait::async_trait;
use serde_json::Value;

use super::quota::Usage;

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }
}

/// What the broker hands the provider after trimming.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub tools: Option<Value>,
    pub metadata: Option<Value>,
}

/// A completed provider call.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// A failed provider call. Usage may still be reported (partial success);
/// the broker accounts it.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub subcode: String,
    pub message: String,
    pub usage: Option<Usage>,
}

/// Anything that can complete chat calls on the broker's behalf.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderReply, ProviderFailure>;

    /// Whether dropping an in-flight call cancels it provider-side. When
    /// false, the broker lets a cancelled call run to completion before
    /// releasing the gate.
    fn supports_cancel(&self) -> bool {
        false
    }
}
