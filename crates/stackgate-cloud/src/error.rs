//! Gateway error types

use crate::classify::ErrorClass;
use thiserror::Error;

/// Raw error delivered by a provider client.
///
/// `status_code` is absent for network-level failures (connection reset,
/// timeout) that never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub status_code: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            code: None,
            message: message.into(),
        }
    }

    /// A failure that never reached the provider
    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Terminal provider failure after classification (and enrichment)
    #[error("{error}")]
    Provider {
        service: String,
        operation: String,
        class: ErrorClass,
        attempts: u32,
        error: ProviderError,
    },

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected response from {operation}: {message}")]
    UnexpectedResponse { operation: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GatewayError {
    pub fn unexpected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Classification of a provider failure, if this is one
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            GatewayError::Provider { class, .. } => Some(*class),
            _ => None,
        }
    }

    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            GatewayError::Provider { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.provider_error().and_then(|e| e.status_code)
    }

    /// Number of calls issued before the error surfaced
    pub fn attempts(&self) -> Option<u32> {
        match self {
            GatewayError::Provider { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// Errors that may carry a provider error code
pub trait ErrorCode {
    fn error_code(&self) -> Option<&str>;
}

impl ErrorCode for ProviderError {
    fn error_code(&self) -> Option<&str> {
        self.code()
    }
}

impl ErrorCode for GatewayError {
    fn error_code(&self) -> Option<&str> {
        self.provider_error().and_then(ProviderError::code)
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
