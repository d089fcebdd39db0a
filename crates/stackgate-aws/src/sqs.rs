//! SQS queue helpers keyed by queue name

use crate::error::{Result, required_str};
use serde_json::json;
use stackgate_cloud::RequestGateway;

pub const SQS: &str = "SQS";

#[derive(Debug, Clone)]
pub struct Queues {
    gateway: RequestGateway,
}

impl Queues {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Create `name` and return its url
    pub async fn create(&self, name: &str) -> Result<String> {
        let response = self
            .gateway
            .invoke_default(SQS, "createQueue", json!({ "QueueName": name }))
            .await?;
        let url = required_str(&response, "/QueueUrl", "createQueue")?;
        tracing::info!("Created SQS queue {} ({})", name, url);
        Ok(url.to_string())
    }

    pub async fn url(&self, name: &str) -> Result<String> {
        let response = self
            .gateway
            .invoke_default(SQS, "getQueueUrl", json!({ "QueueName": name }))
            .await?;
        Ok(required_str(&response, "/QueueUrl", "getQueueUrl")?.to_string())
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.url(name).await?;
        self.gateway
            .invoke_default(SQS, "deleteQueue", json!({ "QueueUrl": url }))
            .await?;
        tracing::info!("Deleted SQS queue {}", name);
        Ok(())
    }

    /// Send `body` to the queue named `name`, returning the message id
    pub async fn send_message(&self, name: &str, body: &str) -> Result<String> {
        let url = self.url(name).await?;
        let response = self
            .gateway
            .invoke_default(
                SQS,
                "sendMessage",
                json!({ "QueueUrl": url, "MessageBody": body }),
            )
            .await?;
        Ok(required_str(&response, "/MessageId", "sendMessage")?.to_string())
    }
}
