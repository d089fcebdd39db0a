//! Provider client abstraction
//!
//! The gateway never speaks the wire protocol itself. A [`ClientFactory`]
//! builds one [`ProviderClient`] per service for every request, configured
//! with [`ClientOptions`]; the client performs the signed call and returns
//! either the decoded response or a typed [`ProviderError`].

use crate::credentials::Credentials;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A client bound to one provider service (e.g. "CloudFormation", "S3")
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Issue `operation` with `params` and wait for the response
    async fn call(
        &self,
        operation: &str,
        params: &Value,
    ) -> std::result::Result<Value, ProviderError>;
}

/// Builds provider clients
pub trait ClientFactory: Send + Sync {
    fn create(&self, service: &str, options: &ClientOptions) -> Result<Arc<dyn ProviderClient>>;
}

/// Per-client construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub credentials: Credentials,
    pub proxy: Option<String>,
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    pub fn region(&self) -> &str {
        &self.credentials.region
    }
}
