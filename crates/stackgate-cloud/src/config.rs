//! Gateway and provider configuration
//!
//! [`GatewayConfig`] is process-wide and read once (usually from the
//! environment) when the gateway is constructed. [`ProviderSettings`] is the
//! `provider` section of a service description.

use crate::classify::DEFAULT_REMEDIATION_URL;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Proxy variables, in lookup order
const PROXY_VARS: &[&str] = &["proxy", "HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy"];

const CLIENT_TIMEOUT_VAR: &str = "AWS_CLIENT_TIMEOUT";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_STAGE: &str = "dev";

/// Static credential fields; all optional so layers can be merged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl StaticCredentials {
    /// Key pair is only usable when both halves are present
    pub fn is_complete(&self) -> bool {
        non_empty(&self.access_key_id).is_some() && non_empty(&self.secret_access_key).is_some()
    }
}

/// One layer of environment-provided credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialLayer {
    pub profile: Option<String>,
    pub keys: StaticCredentials,
}

impl CredentialLayer {
    fn from_lookup(prefix: &str, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let var = |suffix: &str| {
            lookup(format!("{prefix}_{suffix}").as_str()).filter(|v| !v.is_empty())
        };
        Self {
            profile: var("PROFILE"),
            keys: StaticCredentials {
                access_key_id: var("ACCESS_KEY_ID"),
                secret_access_key: var("SECRET_ACCESS_KEY"),
                session_token: var("SESSION_TOKEN"),
            },
        }
    }

    fn is_empty(&self) -> bool {
        self.profile.is_none() && self.keys == StaticCredentials::default()
    }
}

/// Credentials captured from the environment at construction time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentCredentials {
    /// `AWS_*` variables, applying to every stage
    pub global: CredentialLayer,

    /// `AWS_<STAGE>_*` variables keyed by upper-cased stage
    pub stages: HashMap<String, CredentialLayer>,
}

impl EnvironmentCredentials {
    pub fn for_stage(&self, stage: &str) -> Option<&CredentialLayer> {
        self.stages.get(&stage.to_ascii_uppercase())
    }

    fn from_vars(vars: &HashMap<String, String>) -> Self {
        let lookup = |name: &str| vars.get(name).cloned();
        let global = CredentialLayer::from_lookup("AWS", &lookup);

        let mut stages = HashMap::new();
        for name in vars.keys() {
            let Some(rest) = name.strip_prefix("AWS_") else {
                continue;
            };
            let stage = ["_PROFILE", "_ACCESS_KEY_ID", "_SECRET_ACCESS_KEY", "_SESSION_TOKEN"]
                .iter()
                .find_map(|suffix| rest.strip_suffix(suffix));
            let Some(stage) = stage.filter(|s| !s.is_empty()) else {
                continue;
            };
            if stages.contains_key(stage) {
                continue;
            }
            let layer = CredentialLayer::from_lookup(&format!("AWS_{stage}"), &lookup);
            if !layer.is_empty() {
                stages.insert(stage.to_string(), layer);
            }
        }

        Self { global, stages }
    }
}

/// Process-wide client configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Proxy URL handed to every client
    pub proxy: Option<String>,

    /// Client request timeout; provider default when unset
    pub timeout: Option<Duration>,

    /// Link appended to permission errors
    pub remediation_url: String,

    pub environment: EnvironmentCredentials,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: None,
            remediation_url: DEFAULT_REMEDIATION_URL.to_string(),
            environment: EnvironmentCredentials::default(),
        }
    }
}

impl GatewayConfig {
    /// Read proxy, client timeout and credential variables from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let proxy = PROXY_VARS
            .iter()
            .filter_map(|name| vars.get(*name))
            .find(|v| !v.is_empty())
            .cloned();

        let timeout = match vars.get(CLIENT_TIMEOUT_VAR).filter(|v| !v.is_empty()) {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    GatewayError::InvalidConfig(format!(
                        "{CLIENT_TIMEOUT_VAR} must be a number of milliseconds, got '{raw}'"
                    ))
                })?;
                Some(Duration::from_millis(millis))
            }
            None => None,
        };

        if let Some(proxy) = &proxy {
            tracing::debug!("Using proxy: {}", proxy);
        }

        Ok(Self {
            proxy,
            timeout,
            environment: EnvironmentCredentials::from_vars(vars),
            ..Self::default()
        })
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_remediation_url(mut self, url: impl Into<String>) -> Self {
        self.remediation_url = url.into();
        self
    }
}

/// Provider section of a service description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Service name used for stack naming; filled from the description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,

    #[serde(default = "default_stage")]
    pub stage: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<StaticCredentials>,
}

fn default_stage() -> String {
    DEFAULT_STAGE.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl ProviderSettings {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            stage: default_stage(),
            region: default_region(),
            profile: None,
            credentials: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// The parts of a service description the gateway cares about
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescription {
    pub service: String,

    #[serde(default = "empty_provider")]
    pub provider: ProviderSettings,
}

fn empty_provider() -> ProviderSettings {
    ProviderSettings::new("")
}

impl ServiceDescription {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut description: ServiceDescription = serde_yaml::from_str(content)?;
        if description.service.trim().is_empty() {
            return Err(GatewayError::InvalidConfig(
                "service name must not be empty".to_string(),
            ));
        }
        description.provider.service = description.service.clone();
        Ok(description)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded service description from {}", path.display());
        Self::from_yaml_str(&content)
    }

    pub fn into_settings(self) -> ProviderSettings {
        self.provider
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
