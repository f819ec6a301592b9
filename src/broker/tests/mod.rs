
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::broker::{Broker, BrokerSettings, Catalog, Usage, Weights};

use super::provider::{Provider, ProviderFailure, ProviderReply, ProviderRequest};

/// Succeeds immediately with fixed usage.
pub(super) struct EchoProvider;

#[async_trait::async_trait]
impl Provider for EchoProvider {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderReply, ProviderFailure> {
        Ok(ProviderReply {
            content: "ok".to_owned(),
            model: request.model,
            usage: Usage { prompt_tokens: 10, cached_tokens: 0, completion_tokens: 5 },
        })
    }
}

pub(super) fn catalog() -> Catalog {
    let mut models = BTreeMap::new();
    models.insert("base".to_owned(), Weights { input: 3.0, cached: 0.3, output: 15.0 });
    models.insert("fast".to_owned(), Weights { input: 1.0, cached: 0.1, output: 4.0 });
    Catalog::new(models, "base".to_owned()).expect("default model is priced")
}

pub(super) fn settings(initial_units: f64) -> BrokerSettings {
    BrokerSettings {
        default_max_tokens: 1024,
        queue_max_wait: Duration::from_millis(250),
        request_timeout: Duration::from_millis(250),
        safety_factor: 0.9,
        initial_units,
    }
}

pub(super) fn broker(initial_units: f64, provider: Arc<dyn Provider>) -> Broker {
    Broker::new(settings(initial_units), catalog(), provider, "test-session".to_owned())
}
