//! Provider error classification
//!
//! Maps a raw [`ProviderError`] onto one of four categories that drive the
//! retry engine, and enriches permission failures with a remediation link.
//! Classification is total: anything not recognised is [`ErrorClass::Fatal`].

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};

/// Documentation link appended to permission errors
pub const DEFAULT_REMEDIATION_URL: &str = "https://git.io/viZAC";

/// Provider codes signalling rate limiting regardless of status
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "SlowDown",
];

/// Codes of failures that never produced a provider response
const NETWORK_CODES: &[&str] = &[
    "NetworkingError",
    "TimeoutError",
    "RequestTimeout",
    "ECONNRESET",
    "ECONNREFUSED",
    "ETIMEDOUT",
    "EPIPE",
    "EAI_AGAIN",
];

/// Codes of 403 responses caused by missing or invalid credentials
const CREDENTIAL_CODES: &[&str] = &[
    "CredentialsError",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "ExpiredToken",
    "ExpiredTokenException",
    "SignatureDoesNotMatch",
];

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rate limited by the provider; resolves by itself
    Throttling,
    /// Connection-level failure without a provider response
    TransientNetwork,
    /// Missing or invalid credentials
    PermissionDenied,
    /// Everything else
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Throttling | ErrorClass::TransientNetwork)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Throttling => write!(f, "throttling"),
            ErrorClass::TransientNetwork => write!(f, "transient-network"),
            ErrorClass::PermissionDenied => write!(f, "permission-denied"),
            ErrorClass::Fatal => write!(f, "fatal"),
        }
    }
}

/// Classify a raw provider error.
pub fn classify(error: &ProviderError) -> ErrorClass {
    let code = error.code();

    if error.status_code == Some(429) || code.is_some_and(|c| THROTTLING_CODES.contains(&c)) {
        return ErrorClass::Throttling;
    }

    match error.status_code {
        None if code.is_some_and(|c| NETWORK_CODES.contains(&c)) => ErrorClass::TransientNetwork,
        Some(403) if is_credential_failure(error) => ErrorClass::PermissionDenied,
        _ => ErrorClass::Fatal,
    }
}

fn is_credential_failure(error: &ProviderError) -> bool {
    if error.code().is_some_and(|c| CREDENTIAL_CODES.contains(&c)) {
        return true;
    }
    let message = error.message.to_ascii_lowercase();
    message.contains("credentials") || message.contains("security token")
}

/// Classifier holding the remediation link used for enrichment
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    remediation_url: String,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_REMEDIATION_URL)
    }
}

impl ErrorClassifier {
    pub fn new(remediation_url: impl Into<String>) -> Self {
        Self {
            remediation_url: remediation_url.into(),
        }
    }

    pub fn remediation_url(&self) -> &str {
        &self.remediation_url
    }

    pub fn classify(&self, error: &ProviderError) -> ErrorClass {
        classify(error)
    }

    /// Append the remediation link to permission errors; other errors pass
    /// through untouched.
    pub fn enrich(&self, error: ProviderError) -> ProviderError {
        if classify(&error) != ErrorClass::PermissionDenied {
            return error;
        }
        let message = format!(
            "{}. AWS provider credentials not found or invalid. \
             You can find more info on how to set up provider credentials in our docs here: {}",
            error.message.trim_end_matches('.'),
            self.remediation_url
        );
        ProviderError { message, ..error }
    }
}
