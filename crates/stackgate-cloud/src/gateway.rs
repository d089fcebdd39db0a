//! Request gateway
//!
//! Single entry point for provider calls. Each request resolves credentials
//! once, builds a client for the target service and then loops: call,
//! classify the failure, ask the retry policy, sleep, call again. Requests
//! share no mutable state, so any number of them may be in flight at once.

use crate::classify::ErrorClassifier;
use crate::client::{ClientFactory, ClientOptions};
use crate::config::{GatewayConfig, ProviderSettings};
use crate::credentials::CredentialResolver;
use crate::error::{GatewayError, Result};
use crate::retry::{AttemptState, RetryPolicy};
use serde_json::Value;
use std::sync::Arc;

/// One provider call, fixed once handed to the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    service: String,
    operation: String,
    parameters: Value,
    stage: String,
    region: String,
}

impl RequestDescriptor {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        parameters: Value,
        stage: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            parameters,
            stage: stage.into(),
            region: region.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Copy of this request with different parameters
    pub fn with_parameters(&self, parameters: Value) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }
}

/// Resilient gateway in front of a [`ClientFactory`]
#[derive(Clone)]
pub struct RequestGateway {
    settings: Arc<ProviderSettings>,
    config: Arc<GatewayConfig>,
    resolver: Arc<CredentialResolver>,
    classifier: ErrorClassifier,
    policy: RetryPolicy,
    factory: Arc<dyn ClientFactory>,
}

impl RequestGateway {
    pub fn new(
        settings: ProviderSettings,
        config: GatewayConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let resolver = CredentialResolver::new(&settings, config.environment.clone());
        let classifier = ErrorClassifier::new(config.remediation_url.clone());
        Self {
            settings: Arc::new(settings),
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            classifier,
            policy: RetryPolicy::default(),
            factory,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `service.operation` for the given stage and region.
    pub async fn invoke(
        &self,
        service: &str,
        operation: &str,
        params: Value,
        stage: &str,
        region: &str,
    ) -> Result<Value> {
        let request = RequestDescriptor::new(service, operation, params, stage, region);
        self.send(&request).await
    }

    /// Call `service.operation` with the provider's default stage and region.
    pub async fn invoke_default(
        &self,
        service: &str,
        operation: &str,
        params: Value,
    ) -> Result<Value> {
        let request = self.request(service, operation, params);
        self.send(&request).await
    }

    /// Build a descriptor using the provider's default stage and region
    pub fn request(&self, service: &str, operation: &str, params: Value) -> RequestDescriptor {
        RequestDescriptor::new(
            service,
            operation,
            params,
            &self.settings.stage,
            &self.settings.region,
        )
    }

    pub fn client_options(&self, stage: &str, region: &str) -> ClientOptions {
        ClientOptions {
            credentials: self.resolver.resolve_for_stage(stage, Some(region), None),
            proxy: self.config.proxy.clone(),
            timeout: self.config.timeout,
        }
    }

    /// Issue `request`, retrying throttled and transient failures.
    ///
    /// Success values are returned unchanged. On failure the last provider
    /// error is returned, enriched when it is a permission error.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<Value> {
        let options = self.client_options(request.stage(), request.region());
        let client = self.factory.create(request.service(), &options)?;
        tracing::debug!(
            "Created {} client for region {} (stage {})",
            request.service(),
            options.region(),
            request.stage()
        );

        let mut state = AttemptState::new(&self.policy);
        loop {
            let error = match client.call(request.operation(), request.parameters()).await {
                Ok(value) => {
                    if state.attempt() > 1 {
                        tracing::info!(
                            "{}.{} succeeded after {} attempts",
                            request.service(),
                            request.operation(),
                            state.attempt()
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = self.classifier.classify(&error);
            state.record_failure(error.code());
            let decision = self.policy.should_retry(class, &state);

            if !decision.retry {
                tracing::debug!(
                    "{}.{} failed ({}) after {} attempt(s): {}",
                    request.service(),
                    request.operation(),
                    class,
                    state.attempt(),
                    error
                );
                return Err(GatewayError::Provider {
                    service: request.service().to_string(),
                    operation: request.operation().to_string(),
                    class,
                    attempts: state.attempt(),
                    error: self.classifier.enrich(error),
                });
            }

            tracing::warn!(
                "{}.{} failed ({}, attempt {}/{}), retrying in {:?}: {}",
                request.service(),
                request.operation(),
                class,
                state.attempt(),
                state.max_attempts(),
                decision.delay,
                error
            );
            tokio::time::sleep(decision.delay).await;
            state.advance();
        }
    }
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
