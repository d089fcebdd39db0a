//! AWS directory error types

use serde_json::Value;
use stackgate_cloud::{ErrorCode, GatewayError};
use thiserror::Error;

/// Code reported while a stack is still transitioning towards a waited-for
/// status
pub const STACK_NOT_READY: &str = "StackNotReady";

#[derive(Error, Debug)]
pub enum AwsError {
    /// Failure surfaced by the request gateway, passed through unchanged
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Found more than one pool named '{name}' ({count} matches)")]
    DuplicateUserPool { name: String, count: usize },

    #[error("{operation} response is missing '{field}'")]
    MissingField { operation: String, field: String },

    #[error("Function {function} failed ({kind}): {payload}")]
    FunctionFailed {
        function: String,
        kind: String,
        payload: Value,
    },

    #[error("Stack {stack_name} is still {status}")]
    StackNotReady { stack_name: String, status: String },

    #[error("Stack {stack_name} reached {status}: {reason}")]
    StackFailed {
        stack_name: String,
        status: String,
        reason: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AwsError {
    pub fn missing(operation: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            operation: operation.into(),
            field: field.into(),
        }
    }
}

impl ErrorCode for AwsError {
    fn error_code(&self) -> Option<&str> {
        match self {
            AwsError::Gateway(error) => error.error_code(),
            AwsError::StackNotReady { .. } => Some(STACK_NOT_READY),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

/// String at a JSON pointer in an operation's response
pub(crate) fn required_str<'a>(
    response: &'a Value,
    pointer: &str,
    operation: &str,
) -> Result<&'a str> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            let field = pointer.trim_start_matches('/').replace('/', ".");
            AwsError::missing(operation, field)
        })
}
