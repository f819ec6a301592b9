//! Canonical broker error taxonomy.

use thiserror::Error;

/// Terminal failures of one chat request. Each variant is a canonical code
/// exported to callers; none of them leaves the session gate held.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// Admission wait exceeded `queue.max_wait`; no provider call was made.
    #[error("queue_timeout: admission wait exceeded")]
    QueueTimeout,
    /// The caller cancelled while still queued; no provider call was made.
    #[error("cancelled_before_start: caller cancelled while queued")]
    CancelledBeforeStart,
    /// The caller cancelled after acquisition.
    #[error("cancelled_after_start: caller cancelled during the provider call")]
    CancelledAfterStart,
    /// The provider exceeded `request.timeout`.
    #[error("provider_timeout: provider exceeded the request timeout")]
    ProviderTimeout,
    /// The provider failed; `subcode` is provider-specific.
    #[error("provider_error[{subcode}]: {message}")]
    ProviderError { subcode: String, message: String },
}

impl BrokerError {
    /// The canonical code string.
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::QueueTimeout => "queue_timeout",
            BrokerError::CancelledBeforeStart => "cancelled_before_start",
            BrokerError::CancelledAfterStart => "cancelled_after_start",
            BrokerError::ProviderTimeout => "provider_timeout",
            BrokerError::ProviderError { .. } => "provider_error",
        }
    }
}
