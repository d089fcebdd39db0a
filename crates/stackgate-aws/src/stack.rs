//! Stack directory service
//!
//! Stack names are derived, never stored. Resource lookups go to
//! CloudFormation on every call since a redeploy may have replaced them.
//! Auxiliary stacks (created from a raw template) can be created, deleted and
//! waited on until CloudFormation reports a terminal status.

use crate::error::{AwsError, Result, STACK_NOT_READY, required_str};
use serde_json::{Value, json};
use stackgate_cloud::{ErrorCode, PropagationPolicy, RequestGateway, poll_until_success};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

pub const CLOUDFORMATION: &str = "CloudFormation";

/// Logical id of the bucket deployment artifacts are uploaded to
pub const DEPLOYMENT_BUCKET_LOGICAL_ID: &str = "ServerlessDeploymentBucket";

/// `"<service>-<stage>"`
pub fn stack_name(service: &str, stage: &str) -> String {
    format!("{service}-{stage}")
}

/// CloudFormation's own waiters poll every 30 seconds for up to an hour
pub const STACK_WAIT_POLICY: PropagationPolicy = PropagationPolicy {
    max_elapsed: Duration::from_secs(60 * 60),
    interval: Duration::from_secs(30),
};

/// Terminal status a waiter is after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackWait {
    CreateComplete,
    DeleteComplete,
}

impl StackWait {
    pub fn target(self) -> &'static str {
        match self {
            StackWait::CreateComplete => "CREATE_COMPLETE",
            StackWait::DeleteComplete => "DELETE_COMPLETE",
        }
    }

    /// Statuses from which the target can no longer be reached
    fn is_failure(self, status: &str) -> bool {
        if status.ends_with("_FAILED") {
            return true;
        }
        match self {
            StackWait::CreateComplete => matches!(
                status,
                "ROLLBACK_IN_PROGRESS"
                    | "ROLLBACK_COMPLETE"
                    | "DELETE_IN_PROGRESS"
                    | "DELETE_COMPLETE"
            ),
            StackWait::DeleteComplete => false,
        }
    }
}

/// `OutputKey -> OutputValue` of one described stack
pub fn stack_output_map(stack: &Value) -> BTreeMap<String, String> {
    stack
        .get("Outputs")
        .and_then(Value::as_array)
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|output| {
                    let key = output.get("OutputKey")?.as_str()?;
                    let value = output.get("OutputValue")?.as_str()?;
                    Some((key.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn first_stack(response: &Value) -> Option<&Value> {
    response
        .get("Stacks")
        .and_then(Value::as_array)
        .and_then(|stacks| stacks.first())
}

#[derive(Debug, Clone)]
pub struct StackDirectory {
    gateway: RequestGateway,
}

impl StackDirectory {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Stack name of the configured service in `stage`
    pub fn stack_name(&self, stage: &str) -> String {
        stack_name(&self.gateway.settings().service, stage)
    }

    /// Physical id of `logical_id` inside this service's stack
    pub async fn physical_resource_id(
        &self,
        logical_id: &str,
        stage: &str,
        region: &str,
    ) -> Result<String> {
        let stack_name = self.stack_name(stage);
        let response = self
            .gateway
            .invoke(
                CLOUDFORMATION,
                "describeStackResource",
                json!({
                    "StackName": stack_name,
                    "LogicalResourceId": logical_id,
                }),
                stage,
                region,
            )
            .await?;

        let id = required_str(
            &response,
            "/StackResourceDetail/PhysicalResourceId",
            "describeStackResource",
        )?;
        tracing::debug!("{} in {} is {}", logical_id, stack_name, id);
        Ok(id.to_string())
    }

    pub async fn deployment_bucket_name(&self, stage: &str, region: &str) -> Result<String> {
        self.physical_resource_id(DEPLOYMENT_BUCKET_LOGICAL_ID, stage, region).await
    }

    /// Outputs of `stack_name` as `OutputKey -> OutputValue`
    pub async fn stack_outputs(
        &self,
        stack_name: &str,
        stage: &str,
        region: &str,
    ) -> Result<BTreeMap<String, String>> {
        let response = self
            .gateway
            .invoke(
                CLOUDFORMATION,
                "describeStacks",
                json!({ "StackName": stack_name }),
                stage,
                region,
            )
            .await?;

        let stack = first_stack(&response)
            .ok_or_else(|| AwsError::missing("describeStacks", "Stacks"))?;
        Ok(stack_output_map(stack))
    }

    /// Create `stack_name` from a template body, returning the stack id
    pub async fn create_stack(
        &self,
        stack_name: &str,
        template_body: &str,
        stage: &str,
        region: &str,
    ) -> Result<String> {
        let response = self
            .gateway
            .invoke(
                CLOUDFORMATION,
                "createStack",
                json!({ "StackName": stack_name, "TemplateBody": template_body }),
                stage,
                region,
            )
            .await?;
        let id = required_str(&response, "/StackId", "createStack")?;
        tracing::info!("Creating stack {} ({})", stack_name, id);
        Ok(id.to_string())
    }

    pub async fn delete_stack(&self, stack_name: &str, stage: &str, region: &str) -> Result<()> {
        self.gateway
            .invoke(
                CLOUDFORMATION,
                "deleteStack",
                json!({ "StackName": stack_name }),
                stage,
                region,
            )
            .await?;
        tracing::info!("Deleting stack {}", stack_name);
        Ok(())
    }

    /// Poll `describeStacks` until `stack_name` reaches the status `wait`
    /// is after.
    ///
    /// Returns the described stack (`Null` once a deleted stack is gone).
    /// A status the target cannot be reached from fails with
    /// [`AwsError::StackFailed`]; running out of `policy.max_elapsed`
    /// returns the last [`AwsError::StackNotReady`].
    pub async fn wait_for(
        &self,
        stack_name: &str,
        wait: StackWait,
        stage: &str,
        region: &str,
        policy: PropagationPolicy,
    ) -> Result<Value> {
        poll_until_success(
            move || self.stack_status(stack_name, wait, stage, region),
            |code| code == STACK_NOT_READY,
            Instant::now(),
            policy,
        )
        .await
    }

    async fn stack_status(
        &self,
        stack_name: &str,
        wait: StackWait,
        stage: &str,
        region: &str,
    ) -> Result<Value> {
        let described = self
            .gateway
            .invoke(
                CLOUDFORMATION,
                "describeStacks",
                json!({ "StackName": stack_name }),
                stage,
                region,
            )
            .await;

        let response = match described {
            Ok(response) => response,
            // "Stack with id ... does not exist"
            Err(error)
                if wait == StackWait::DeleteComplete
                    && error.error_code() == Some("ValidationError") =>
            {
                return Ok(Value::Null);
            }
            Err(error) => return Err(error.into()),
        };

        let Some(stack) = first_stack(&response) else {
            return match wait {
                StackWait::DeleteComplete => Ok(Value::Null),
                StackWait::CreateComplete => Err(AwsError::missing("describeStacks", "Stacks")),
            };
        };
        let status = required_str(stack, "/StackStatus", "describeStacks")?;

        if status == wait.target() {
            tracing::info!("Stack {} reached {}", stack_name, status);
            return Ok(stack.clone());
        }
        if wait.is_failure(status) {
            return Err(AwsError::StackFailed {
                stack_name: stack_name.to_string(),
                status: status.to_string(),
                reason: stack
                    .get("StackStatusReason")
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given")
                    .to_string(),
            });
        }
        Err(AwsError::StackNotReady {
            stack_name: stack_name.to_string(),
            status: status.to_string(),
        })
    }
}
