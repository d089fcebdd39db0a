//! AWS directory queries for StackGate
//!
//! Thin, AWS-flavoured helpers on top of [`stackgate_cloud::RequestGateway`].
//! Every helper goes through the gateway, so retries, credential resolution
//! and error enrichment apply uniformly.
//!
//! # Features
//!
//! - Stack naming and stack resource lookup (deployment bucket, outputs)
//! - Auxiliary stack creation, deletion and status waiters
//! - Cognito user-pool lookups, app clients, users and password sign-in
//! - SQS queue helpers keyed by queue name
//! - Lambda invocation tolerant of EFS mount propagation
//!
//! # Example
//!
//! ```ignore
//! use stackgate_aws::StackDirectory;
//!
//! let directory = StackDirectory::new(gateway.clone());
//! assert_eq!(directory.stack_name("dev"), "myservice-dev");
//!
//! let bucket = directory.deployment_bucket_name("dev", "us-east-1").await?;
//! ```

pub mod cognito;
pub mod error;
pub mod lambda;
pub mod sqs;
pub mod stack;

pub use cognito::UserPools;
pub use error::{AwsError, Result, STACK_NOT_READY};
pub use lambda::{EFS_MAX_PROPAGATION_TIME, EFS_MOUNT_PROPAGATION_CODES, Functions};
pub use sqs::Queues;
pub use stack::{
    DEPLOYMENT_BUCKET_LOGICAL_ID, STACK_WAIT_POLICY, StackDirectory, StackWait, stack_name,
    stack_output_map,
};
