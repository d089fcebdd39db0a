//! Pagination over continuation-token list operations

use crate::error::{GatewayError, Result};
use crate::gateway::{RequestDescriptor, RequestGateway};
use serde_json::Value;

pub const DEFAULT_TOKEN_FIELD: &str = "NextToken";

/// Where a list operation keeps its items and cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    /// Response field holding this page's items
    pub items_key: String,

    /// Request field the cursor is sent in
    pub input_token: String,

    /// Response field the next cursor arrives in
    pub output_token: String,
}

impl PageSpec {
    pub fn new(items_key: impl Into<String>) -> Self {
        Self {
            items_key: items_key.into(),
            input_token: DEFAULT_TOKEN_FIELD.to_string(),
            output_token: DEFAULT_TOKEN_FIELD.to_string(),
        }
    }

    pub fn with_tokens(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_token = input.into();
        self.output_token = output.into();
        self
    }
}

/// Opaque provider cursor; at most one is held per traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor(String);

impl PaginationCursor {
    fn from_response(response: &Value, field: &str) -> Option<Self> {
        response
            .get(field)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(|t| Self(t.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Follows continuation tokens through the gateway
#[derive(Debug, Clone)]
pub struct Paginator<'a> {
    gateway: &'a RequestGateway,
    spec: PageSpec,
    stage: String,
    region: String,
}

impl<'a> Paginator<'a> {
    /// Paginator using the provider's default stage and region
    pub fn new(gateway: &'a RequestGateway, spec: PageSpec) -> Self {
        let settings = gateway.settings();
        Self {
            gateway,
            spec,
            stage: settings.stage.clone(),
            region: settings.region.clone(),
        }
    }

    pub fn with_target(mut self, stage: impl Into<String>, region: impl Into<String>) -> Self {
        self.stage = stage.into();
        self.region = region.into();
        self
    }

    /// Fetch every page and return all items in page order.
    ///
    /// Any failure aborts the traversal; items gathered so far are dropped.
    pub async fn collect_all(
        &self,
        service: &str,
        operation: &str,
        params: Value,
    ) -> Result<Vec<Value>> {
        self.collect_matching(service, operation, params, |_| true).await
    }

    /// Like [`collect_all`](Self::collect_all), keeping only items accepted
    /// by `keep`.
    pub async fn collect_matching<F>(
        &self,
        service: &str,
        operation: &str,
        params: Value,
        keep: F,
    ) -> Result<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let base = match params {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(GatewayError::InvalidConfig(format!(
                    "{service}.{operation} parameters must be an object, got {other}"
                )));
            }
        };

        let first = RequestDescriptor::new(
            service,
            operation,
            Value::Object(base.clone()),
            &self.stage,
            &self.region,
        );
        let mut items = Vec::new();
        let mut cursor: Option<PaginationCursor> = None;
        let mut pages = 0usize;

        loop {
            let request = match &cursor {
                None => first.clone(),
                Some(cursor) => {
                    let mut page_params = base.clone();
                    page_params.insert(
                        self.spec.input_token.clone(),
                        Value::String(cursor.as_str().to_string()),
                    );
                    first.with_parameters(Value::Object(page_params))
                }
            };
            let response = self.gateway.send(&request).await?;
            pages += 1;

            match response.get(&self.spec.items_key) {
                Some(Value::Array(page)) => {
                    items.extend(page.iter().filter(|item| keep(item)).cloned());
                }
                None | Some(Value::Null) => {}
                Some(_) => {
                    return Err(GatewayError::unexpected(
                        operation,
                        format!("'{}' is not an array", self.spec.items_key),
                    ));
                }
            }

            let next = PaginationCursor::from_response(&response, &self.spec.output_token);
            match next {
                None => break,
                // A cursor that does not advance would never terminate
                Some(next) if cursor.as_ref() == Some(&next) => {
                    return Err(GatewayError::unexpected(
                        operation,
                        format!("'{}' repeated {}", self.spec.output_token, next.as_str()),
                    ));
                }
                Some(next) => cursor = Some(next),
            }
        }

        tracing::debug!(
            "{}.{} returned {} item(s) over {} page(s)",
            service,
            operation,
            items.len(),
            pages
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, ProviderSettings};
    use crate::error::ProviderError;
    use crate::retry::RetryPolicy;
    use crate::testing::FakeClientFactory;
    use serde_json::json;

    fn gateway(fake: &FakeClientFactory) -> RequestGateway {
        RequestGateway::new(
            ProviderSettings::new("myservice"),
            GatewayConfig::default(),
            fake.factory(),
        )
        .with_retry_policy(RetryPolicy::no_retry())
    }

    fn script_three_pages(fake: &FakeClientFactory) {
        fake.respond(
            "CognitoIdentityServiceProvider",
            "listUserPools",
            Ok(json!({ "UserPools": [{ "Id": "1" }, { "Id": "2" }], "NextToken": "page-2" })),
        );
        fake.respond(
            "CognitoIdentityServiceProvider",
            "listUserPools",
            Ok(json!({ "UserPools": [{ "Id": "3" }], "NextToken": "page-3" })),
        );
        fake.respond(
            "CognitoIdentityServiceProvider",
            "listUserPools",
            Ok(json!({ "UserPools": [{ "Id": "4" }] })),
        );
    }

    #[tokio::test]
    async fn test_collects_three_pages_in_order() {
        let fake = FakeClientFactory::new();
        script_three_pages(&fake);
        let gateway = gateway(&fake);

        let items = Paginator::new(&gateway, PageSpec::new("UserPools"))
            .collect_all(
                "CognitoIdentityServiceProvider",
                "listUserPools",
                json!({ "MaxResults": 60 }),
            )
            .await
            .unwrap();

        let ids: Vec<_> = items.iter().map(|i| i["Id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["1", "2", "3", "4"]);

        let calls = fake.calls_to("CognitoIdentityServiceProvider", "listUserPools");
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].params, json!({ "MaxResults": 60 }));
        assert_eq!(calls[1].params, json!({ "MaxResults": 60, "NextToken": "page-2" }));
        assert_eq!(calls[2].params, json!({ "MaxResults": 60, "NextToken": "page-3" }));
    }

    #[tokio::test]
    async fn test_failure_discards_partial_results() {
        let fake = FakeClientFactory::new();
        fake.respond(
            "SQS",
            "listQueues",
            Ok(json!({ "QueueUrls": ["a"], "NextToken": "t" })),
        );
        fake.respond("SQS", "listQueues", Err(ProviderError::new(500, "boom")));

        let gateway = gateway(&fake);
        let err = Paginator::new(&gateway, PageSpec::new("QueueUrls"))
            .collect_all("SQS", "listQueues", json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(fake.call_count("SQS", "listQueues"), 2);
    }

    #[tokio::test]
    async fn test_custom_token_fields_and_filter() {
        let fake = FakeClientFactory::new();
        fake.respond(
            "CloudFormation",
            "listStacks",
            Ok(json!({ "StackSummaries": [{ "n": 1 }, { "n": 2 }], "Next": "x" })),
        );
        fake.respond(
            "CloudFormation",
            "listStacks",
            Ok(json!({ "StackSummaries": [{ "n": 3 }], "Next": "" })),
        );

        let gateway = gateway(&fake);
        let items = Paginator::new(
            &gateway,
            PageSpec::new("StackSummaries").with_tokens("Cursor", "Next"),
        )
        .collect_matching("CloudFormation", "listStacks", Value::Null, |item| {
            item["n"].as_i64().is_some_and(|n| n % 2 == 1)
        })
        .await
        .unwrap();

        assert_eq!(items, vec![json!({ "n": 1 }), json!({ "n": 3 })]);
        let calls = fake.calls();
        assert_eq!(calls[1].params, json!({ "Cursor": "x" }));
    }

    #[tokio::test]
    async fn test_repeated_token_aborts_traversal() {
        let fake = FakeClientFactory::new();
        fake.respond(
            "SQS",
            "listQueues",
            Ok(json!({ "QueueUrls": ["a"], "NextToken": "same" })),
        );
        fake.respond(
            "SQS",
            "listQueues",
            Ok(json!({ "QueueUrls": ["b"], "NextToken": "same" })),
        );
        fake.respond("SQS", "listQueues", Ok(json!({ "QueueUrls": ["c"] })));

        let gateway = gateway(&fake);
        let err = Paginator::new(&gateway, PageSpec::new("QueueUrls"))
            .collect_all("SQS", "listQueues", json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::UnexpectedResponse { .. }));
        assert_eq!(fake.call_count("SQS", "listQueues"), 2);
        assert_eq!(fake.pending("SQS", "listQueues"), 1);
    }

    #[tokio::test]
    async fn test_missing_items_key_is_an_empty_page() {
        let fake = FakeClientFactory::new();
        fake.respond("SQS", "listQueues", Ok(json!({})));

        let gateway = gateway(&fake);
        let items = Paginator::new(&gateway, PageSpec::new("QueueUrls"))
            .collect_all("SQS", "listQueues", json!({}))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_parameters_rejected() {
        let fake = FakeClientFactory::new();
        let gateway = gateway(&fake);
        let err = Paginator::new(&gateway, PageSpec::new("Items"))
            .collect_all("SQS", "listQueues", json!([1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(_)));
        assert!(fake.calls().is_empty());
    }
}
