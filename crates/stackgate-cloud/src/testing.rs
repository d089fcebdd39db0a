//! Scripted provider clients for tests
//!
//! [`FakeClientFactory`] hands out clients that replay queued responses per
//! `(service, operation)` pair and record every call they receive.
//!
//! ```ignore
//! let fake = FakeClientFactory::new();
//! fake.respond("S3", "putObject", Err(ProviderError::new(429, "slow down")));
//! fake.respond("S3", "putObject", Ok(json!({ "called": true })));
//!
//! let gateway = RequestGateway::new(settings, GatewayConfig::default(), fake.factory());
//! ```

use crate::client::{ClientFactory, ClientOptions, ProviderClient};
use crate::error::{GatewayError, ProviderError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Response = std::result::Result<Value, ProviderError>;

/// One call observed by a fake client
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub service: String,
    pub operation: String,
    pub params: Value,
    pub options: ClientOptions,
}

#[derive(Default)]
struct FakeState {
    responses: HashMap<(String, String), VecDeque<Response>>,
    calls: Vec<RecordedCall>,
    known_services: Option<HashSet<String>>,
}

/// Factory for scripted clients; clones share the same script and log
#[derive(Clone, Default)]
pub struct FakeClientFactory {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every service not listed with `GatewayError::UnknownService`
    pub fn with_known_services(self, services: &[&str]) -> Self {
        self.lock().known_services = Some(services.iter().map(|s| s.to_string()).collect());
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the next response for `service.operation`
    pub fn respond(&self, service: &str, operation: &str, response: Response) {
        self.lock()
            .responses
            .entry((service.to_string(), operation.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn factory(&self) -> Arc<dyn ClientFactory> {
        Arc::new(self.clone())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, service: &str, operation: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.service == service && c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, service: &str, operation: &str) -> usize {
        self.calls_to(service, operation).len()
    }

    /// Responses still queued for `service.operation`
    pub fn pending(&self, service: &str, operation: &str) -> usize {
        self.lock()
            .responses
            .get(&(service.to_string(), operation.to_string()))
            .map_or(0, VecDeque::len)
    }
}

impl ClientFactory for FakeClientFactory {
    fn create(&self, service: &str, options: &ClientOptions) -> Result<Arc<dyn ProviderClient>> {
        if let Some(known) = &self.lock().known_services {
            if !known.contains(service) {
                return Err(GatewayError::UnknownService(service.to_string()));
            }
        }
        Ok(Arc::new(FakeClient {
            service: service.to_string(),
            options: options.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// Client replaying the factory's script
pub struct FakeClient {
    service: String,
    options: ClientOptions,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl ProviderClient for FakeClient {
    async fn call(&self, operation: &str, params: &Value) -> Response {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.calls.push(RecordedCall {
            service: self.service.clone(),
            operation: operation.to_string(),
            params: params.clone(),
            options: self.options.clone(),
        });
        state
            .responses
            .get_mut(&(self.service.clone(), operation.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ProviderError::new(
                    500,
                    format!("no scripted response for {}.{}", self.service, operation),
                ))
            })
    }
}
