//! StackGate Cloud Gateway
//!
//! This crate provides the resilient request gateway every provider
//! interaction flows through: credential resolution, retry with backoff
//! under rate limiting, pagination over continuation tokens, and
//! classification of provider errors into actionable categories.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │        deployment orchestrator / tests           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ invoke / collect_all / poll
//! ┌─────────────────▼───────────────────────────────┐
//! │                stackgate-cloud                   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │  Paginator   │  │    Poller    │             │
//! │  └──────┬───────┘  └──────────────┘             │
//! │  ┌──────▼───────────────────────────────────┐   │
//! │  │              RequestGateway               │   │
//! │  │  credentials → call → classify → retry    │   │
//! │  └──────────────────┬───────────────────────┘   │
//! └─────────────────────┼───────────────────────────┘
//!                       │ trait ClientFactory / ProviderClient
//!               ┌───────▼───────┐
//!               │  SDK client   │
//!               └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stackgate_cloud::{GatewayConfig, RequestGateway, ServiceDescription};
//!
//! let settings = ServiceDescription::load("serverless.yml")?.into_settings();
//! let gateway = RequestGateway::new(settings, GatewayConfig::from_env()?, factory);
//!
//! let data = gateway
//!     .invoke("S3", "putObject", json!({ "Bucket": "b", "Key": "k" }), "dev", "us-east-1")
//!     .await?;
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod paginate;
pub mod poll;
pub mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use classify::{DEFAULT_REMEDIATION_URL, ErrorClass, ErrorClassifier, classify};
pub use client::{ClientFactory, ClientOptions, ProviderClient};
pub use config::{
    CredentialLayer, EnvironmentCredentials, GatewayConfig, ProviderSettings, ServiceDescription,
    StaticCredentials,
};
pub use credentials::{CredentialResolver, CredentialSet, Credentials};
pub use error::{ErrorCode, GatewayError, ProviderError, Result};
pub use gateway::{RequestDescriptor, RequestGateway};
pub use paginate::{PageSpec, PaginationCursor, Paginator};
pub use poll::{PropagationPolicy, poll_until_success};
pub use retry::{AttemptState, Backoff, RetryDecision, RetryPolicy};
