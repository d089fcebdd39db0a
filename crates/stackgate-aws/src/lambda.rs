//! Lambda invocation
//!
//! Functions attached to a freshly created EFS access point may fail to
//! mount for a few minutes after deployment. [`Functions::invoke_after_propagation`]
//! keeps invoking through those failures until the propagation budget runs
//! out.

use crate::error::{AwsError, Result};
use serde_json::{Map, Value};
use stackgate_cloud::{PropagationPolicy, RequestGateway, poll_until_success};
use std::time::Duration;
use tokio::time::Instant;

pub const LAMBDA: &str = "Lambda";

/// Error codes Lambda returns while an EFS mount target is still propagating
pub const EFS_MOUNT_PROPAGATION_CODES: &[&str] =
    &["EFSMountFailureException", "EFSMountTimeoutException"];

pub const EFS_MAX_PROPAGATION_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct Functions {
    gateway: RequestGateway,
}

impl Functions {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Synchronously invoke `function` and decode its JSON result.
    ///
    /// A function that ran but raised an error yields
    /// [`AwsError::FunctionFailed`] carrying the decoded error payload.
    pub async fn invoke(&self, function: &str, payload: Option<&Value>) -> Result<Value> {
        let mut params = Map::new();
        params.insert("FunctionName".into(), Value::String(function.to_string()));
        params.insert("InvocationType".into(), Value::String("RequestResponse".into()));
        if let Some(payload) = payload {
            params.insert("Payload".into(), Value::String(serde_json::to_string(payload)?));
        }

        let response = self
            .gateway
            .invoke_default(LAMBDA, "invoke", Value::Object(params))
            .await?;
        let result = decode_payload(response.get("Payload"))?;

        if let Some(kind) = response.get("FunctionError").and_then(Value::as_str) {
            return Err(AwsError::FunctionFailed {
                function: function.to_string(),
                kind: kind.to_string(),
                payload: result,
            });
        }
        Ok(result)
    }

    /// [`invoke`](Self::invoke), retried while the function's EFS mount is
    /// still propagating and `policy.max_elapsed` has not passed since
    /// `started_at` (usually the end of the deployment).
    pub async fn invoke_after_propagation(
        &self,
        function: &str,
        payload: Option<&Value>,
        started_at: Instant,
        policy: PropagationPolicy,
    ) -> Result<Value> {
        poll_until_success(
            move || self.invoke(function, payload),
            |code| EFS_MOUNT_PROPAGATION_CODES.contains(&code),
            started_at,
            policy,
        )
        .await
    }
}

/// Lambda hands the payload back as serialized JSON
fn decode_payload(payload: Option<&Value>) -> Result<Value> {
    match payload {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(Value::Null),
        Some(Value::String(raw)) => Ok(serde_json::from_str(raw)?),
        Some(decoded) => Ok(decoded.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stackgate_cloud::testing::FakeClientFactory;
    use stackgate_cloud::{ErrorCode, GatewayConfig, ProviderError, ProviderSettings, RetryPolicy};

    fn functions(fake: &FakeClientFactory) -> Functions {
        Functions::new(
            RequestGateway::new(
                ProviderSettings::new("myservice"),
                GatewayConfig::default(),
                fake.factory(),
            )
            .with_retry_policy(RetryPolicy::no_retry()),
        )
    }

    fn mount_failure() -> ProviderError {
        ProviderError::new(403, "The function couldn't mount the Amazon EFS file system")
            .with_code("EFSMountFailureException")
    }

    #[tokio::test]
    async fn test_invoke_decodes_payload() {
        let fake = FakeClientFactory::new();
        fake.respond(
            LAMBDA,
            "invoke",
            Ok(json!({ "StatusCode": 200, "Payload": "{\"result\":\"fromlambda\"}" })),
        );

        let result = functions(&fake)
            .invoke("myservice-dev-reader", None)
            .await
            .unwrap();

        assert_eq!(result, json!({ "result": "fromlambda" }));
        assert_eq!(
            fake.calls()[0].params,
            json!({ "FunctionName": "myservice-dev-reader", "InvocationType": "RequestResponse" })
        );
    }

    #[tokio::test]
    async fn test_invoke_serializes_input() {
        let fake = FakeClientFactory::new();
        fake.respond(LAMBDA, "invoke", Ok(json!({ "StatusCode": 200 })));

        let result = functions(&fake)
            .invoke("fn", Some(&json!({ "n": 1 })))
            .await
            .unwrap();

        assert_eq!(result, Value::Null);
        assert_eq!(fake.calls()[0].params["Payload"], "{\"n\":1}");
    }

    #[tokio::test]
    async fn test_function_error_is_surfaced() {
        let fake = FakeClientFactory::new();
        fake.respond(
            LAMBDA,
            "invoke",
            Ok(json!({
                "StatusCode": 200,
                "FunctionError": "Unhandled",
                "Payload": "{\"errorMessage\":\"boom\"}"
            })),
        );

        let err = functions(&fake).invoke("fn", None).await.unwrap_err();
        match err {
            AwsError::FunctionFailed { kind, payload, .. } => {
                assert_eq!(kind, "Unhandled");
                assert_eq!(payload["errorMessage"], "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_after_propagation_retries_mount_failures() {
        let fake = FakeClientFactory::new();
        fake.respond(LAMBDA, "invoke", Err(mount_failure()));
        fake.respond(
            LAMBDA,
            "invoke",
            Err(ProviderError::new(408, "mount timed out").with_code("EFSMountTimeoutException")),
        );
        fake.respond(LAMBDA, "invoke", Ok(json!({ "Payload": "null" })));

        let result = functions(&fake)
            .invoke_after_propagation("writer", None, Instant::now(), PropagationPolicy::default())
            .await
            .unwrap();

        assert_eq!(result, Value::Null);
        assert_eq!(fake.call_count(LAMBDA, "invoke"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_after_propagation_stops_after_budget() {
        let fake = FakeClientFactory::new();
        for _ in 0..10 {
            fake.respond(LAMBDA, "invoke", Err(mount_failure()));
        }

        let started_at = Instant::now();
        tokio::time::advance(EFS_MAX_PROPAGATION_TIME).await;

        let err = functions(&fake)
            .invoke_after_propagation("writer", None, started_at, PropagationPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), Some("EFSMountFailureException"));
        assert_eq!(fake.call_count(LAMBDA, "invoke"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_after_propagation_ignores_other_codes() {
        let fake = FakeClientFactory::new();
        fake.respond(
            LAMBDA,
            "invoke",
            Err(ProviderError::new(404, "Function not found")
                .with_code("ResourceNotFoundException")),
        );

        let err = functions(&fake)
            .invoke_after_propagation("writer", None, Instant::now(), PropagationPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), Some("ResourceNotFoundException"));
        assert_eq!(fake.call_count(LAMBDA, "invoke"), 1);
    }

    #[test]
    fn test_decode_payload_variants() {
        assert_eq!(decode_payload(None).unwrap(), Value::Null);
        assert_eq!(decode_payload(Some(&json!(""))).unwrap(), Value::Null);
        assert_eq!(decode_payload(Some(&json!({ "a": 1 }))).unwrap(), json!({ "a": 1 }));
        assert!(decode_payload(Some(&json!("{not json"))).is_err());
    }
}
