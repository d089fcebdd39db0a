//! Cognito user-pool lookups

use crate::error::{AwsError, Result, required_str};
use serde_json::{Map, Value, json};
use stackgate_cloud::{GatewayError, PageSpec, Paginator, RequestGateway};

pub const COGNITO_IDP: &str = "CognitoIdentityServiceProvider";

/// Largest page `listUserPools` accepts
const LIST_PAGE_SIZE: u32 = 60;

/// Flow used for username/password sign-in
const PASSWORD_AUTH_FLOW: &str = "USER_PASSWORD_AUTH";

#[derive(Debug, Clone)]
pub struct UserPools {
    gateway: RequestGateway,
}

impl UserPools {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Every user pool accepted by `keep`, across all pages
    pub async fn find_matching<F>(&self, keep: F) -> Result<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let pools = Paginator::new(&self.gateway, PageSpec::new("UserPools"))
            .collect_matching(
                COGNITO_IDP,
                "listUserPools",
                json!({ "MaxResults": LIST_PAGE_SIZE }),
                keep,
            )
            .await?;
        Ok(pools)
    }

    /// The pool named `name`, if exactly one exists.
    ///
    /// More than one pool with that name is an error.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Value>> {
        tracing::debug!("Looking up cognito user pool by name {}", name);
        let mut pools = self
            .find_matching(|pool| pool.get("Name").and_then(Value::as_str) == Some(name))
            .await?;

        match pools.len() {
            0 => Ok(None),
            1 => Ok(pools.pop()),
            count => Err(AwsError::DuplicateUserPool {
                name: name.to_string(),
                count,
            }),
        }
    }

    pub async fn describe(&self, pool_id: &str) -> Result<Value> {
        let response = self
            .gateway
            .invoke_default(COGNITO_IDP, "describeUserPool", json!({ "UserPoolId": pool_id }))
            .await?;
        tracing::debug!("cognito.describeUserPool {} {}", pool_id, response);
        Ok(response)
    }

    /// Create a pool; `config` entries override the defaults
    pub async fn create(&self, name: &str, config: Value) -> Result<Value> {
        let mut params = Map::new();
        params.insert("PoolName".to_string(), Value::String(name.to_string()));
        match config {
            Value::Object(extra) => params.extend(extra),
            Value::Null => {}
            other => {
                return Err(GatewayError::InvalidConfig(format!(
                    "user pool config must be an object, got {other}"
                ))
                .into());
            }
        }

        let response = self
            .gateway
            .invoke_default(COGNITO_IDP, "createUserPool", Value::Object(params))
            .await?;
        if let Ok(id) = required_str(&response, "/UserPool/Id", "createUserPool") {
            tracing::info!("Created user pool {} ({})", name, id);
        }
        Ok(response)
    }

    pub async fn delete_by_id(&self, pool_id: &str) -> Result<()> {
        self.gateway
            .invoke_default(COGNITO_IDP, "deleteUserPool", json!({ "UserPoolId": pool_id }))
            .await?;
        tracing::info!("Deleted user pool {}", pool_id);
        Ok(())
    }

    /// Delete the pool named `name`; `false` when there is none
    pub async fn delete_by_name(&self, name: &str) -> Result<bool> {
        let Some(pool) = self.find_by_name(name).await? else {
            return Ok(false);
        };
        let id = required_str(&pool, "/Id", "listUserPools")?;
        self.delete_by_id(id).await?;
        Ok(true)
    }

    /// App client allowed to sign in with username and password
    pub async fn create_client(&self, name: &str, pool_id: &str) -> Result<Value> {
        let response = self
            .gateway
            .invoke_default(
                COGNITO_IDP,
                "createUserPoolClient",
                json!({
                    "ClientName": name,
                    "UserPoolId": pool_id,
                    "ExplicitAuthFlows": [PASSWORD_AUTH_FLOW],
                }),
            )
            .await?;
        Ok(response)
    }

    /// Admin-create `username` with a temporary password
    pub async fn create_user(
        &self,
        pool_id: &str,
        username: &str,
        password: &str,
    ) -> Result<Value> {
        let response = self
            .gateway
            .invoke_default(
                COGNITO_IDP,
                "adminCreateUser",
                json!({
                    "UserPoolId": pool_id,
                    "Username": username,
                    "TemporaryPassword": password,
                }),
            )
            .await?;
        Ok(response)
    }

    /// Set a permanent password, confirming the user
    pub async fn set_user_password(
        &self,
        pool_id: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.gateway
            .invoke_default(
                COGNITO_IDP,
                "adminSetUserPassword",
                json!({
                    "UserPoolId": pool_id,
                    "Username": username,
                    "Password": password,
                    "Permanent": true,
                }),
            )
            .await?;
        Ok(())
    }

    /// Sign in with `USER_PASSWORD_AUTH`; the response carries
    /// `AuthenticationResult` tokens
    pub async fn initiate_auth(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<Value> {
        let response = self
            .gateway
            .invoke_default(
                COGNITO_IDP,
                "initiateAuth",
                json!({
                    "ClientId": client_id,
                    "AuthFlow": PASSWORD_AUTH_FLOW,
                    "AuthParameters": {
                        "USERNAME": username,
                        "PASSWORD": password,
                    },
                }),
            )
            .await?;
        Ok(response)
    }
}
