//! Credential resolution
//!
//! Produces the region/credential bundle a provider client is built with.
//! A bundle without a `credentials` field tells the client to use the ambient
//! credential chain (environment, instance role, ...). Empty strings are
//! treated as "not configured".

use crate::config::{EnvironmentCredentials, ProviderSettings, StaticCredentials, non_empty};
use serde::{Deserialize, Serialize};

/// Resolved credential fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl CredentialSet {
    fn is_empty(&self) -> bool {
        self == &CredentialSet::default()
    }

    /// A configured profile replaces whatever lower layers resolved
    fn apply_profile(&mut self, profile: &Option<String>) {
        if let Some(profile) = non_empty(profile) {
            *self = CredentialSet {
                profile: Some(profile.to_string()),
                ..CredentialSet::default()
            };
        }
    }

    /// A complete key pair replaces whatever lower layers resolved
    fn apply_keys(&mut self, keys: &StaticCredentials) {
        if !keys.is_complete() {
            return;
        }
        *self = CredentialSet {
            profile: None,
            access_key_id: keys.access_key_id.clone(),
            secret_access_key: keys.secret_access_key.clone(),
            session_token: non_empty(&keys.session_token).map(str::to_string),
        };
    }
}

/// Region plus optional credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialSet>,
}

impl Credentials {
    /// Bundle deferring to the ambient credential chain
    pub fn ambient(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
        }
    }

    pub fn profile(&self) -> Option<&str> {
        self.credentials.as_ref().and_then(|c| c.profile.as_deref())
    }

    pub fn is_ambient(&self) -> bool {
        self.credentials.is_none()
    }
}

/// Resolves credentials from provider settings and environment layers
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    default_region: String,
    profile: Option<String>,
    static_keys: Option<StaticCredentials>,
    environment: EnvironmentCredentials,
}

impl CredentialResolver {
    pub fn new(settings: &ProviderSettings, environment: EnvironmentCredentials) -> Self {
        Self {
            default_region: settings.region.clone(),
            profile: settings.profile.clone(),
            static_keys: settings.credentials.clone(),
            environment,
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    fn region_or_default(&self, region: Option<&str>) -> String {
        region
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_region.as_str())
            .to_string()
    }

    /// Resolve from the override argument, else the provider profile.
    pub fn resolve(&self, region: Option<&str>, profile_override: Option<&str>) -> Credentials {
        let region = self.region_or_default(region);
        let profile = profile_override
            .filter(|p| !p.is_empty())
            .or_else(|| non_empty(&self.profile));

        match profile {
            Some(profile) => Credentials {
                region,
                credentials: Some(CredentialSet {
                    profile: Some(profile.to_string()),
                    ..CredentialSet::default()
                }),
            },
            None => Credentials::ambient(region),
        }
    }

    /// Resolve through every layer, lowest priority first: provider keys,
    /// provider profile, `AWS_*` environment, `AWS_<STAGE>_*` environment,
    /// explicit override.
    ///
    /// Each layer that yields credentials replaces the bundle as a whole;
    /// within an environment layer the profile wins over keys.
    pub fn resolve_for_stage(
        &self,
        stage: &str,
        region: Option<&str>,
        profile_override: Option<&str>,
    ) -> Credentials {
        let region = self.region_or_default(region);
        let mut set = CredentialSet::default();

        if let Some(keys) = &self.static_keys {
            set.apply_keys(keys);
        }
        set.apply_profile(&self.profile);

        set.apply_keys(&self.environment.global.keys);
        set.apply_profile(&self.environment.global.profile);

        if let Some(layer) = self.environment.for_stage(stage) {
            set.apply_keys(&layer.keys);
            set.apply_profile(&layer.profile);
        }

        set.apply_profile(&profile_override.map(str::to_string));

        if set.is_empty() {
            return Credentials::ambient(region);
        }
        Credentials {
            region,
            credentials: Some(set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialLayer;
    use serde_json::json;

    fn resolver(profile: Option<&str>) -> CredentialResolver {
        let mut settings = ProviderSettings::new("myservice");
        settings.profile = profile.map(str::to_string);
        CredentialResolver::new(&settings, EnvironmentCredentials::default())
    }

    #[test]
    fn test_sets_region() {
        let credentials = resolver(None).resolve(Some("testregion"), None);
        assert_eq!(credentials.region, "testregion");
    }

    #[test]
    fn test_region_defaults_to_provider_region() {
        let credentials = resolver(None).resolve(None, None);
        assert_eq!(credentials.region, "us-east-1");
    }

    #[test]
    fn test_profile_from_provider() {
        let credentials = resolver(Some("notDefault")).resolve(None, None);
        assert_eq!(credentials.profile(), Some("notDefault"));
    }

    #[test]
    fn test_override_beats_provider_profile() {
        let credentials = resolver(Some("notDefault")).resolve(None, Some("other"));
        assert_eq!(credentials.profile(), Some("other"));
    }

    #[test]
    fn test_no_credentials_when_profile_unset() {
        let credentials = resolver(None).resolve(Some("testregion"), None);
        assert_eq!(
            serde_json::to_value(&credentials).unwrap(),
            json!({ "region": "testregion" })
        );
    }

    #[test]
    fn test_no_credentials_when_profile_empty() {
        let credentials = resolver(Some("")).resolve(Some("testregion"), Some(""));
        assert!(credentials.is_ambient());
        assert_eq!(
            serde_json::to_value(&credentials).unwrap(),
            json!({ "region": "testregion" })
        );
    }

    #[test]
    fn test_stage_layers_override_global() {
        let mut environment = EnvironmentCredentials::default();
        environment.global.profile = Some("shared".to_string());
        environment.stages.insert(
            "PROD".to_string(),
            CredentialLayer {
                profile: Some("production".to_string()),
                ..CredentialLayer::default()
            },
        );
        let settings = ProviderSettings::new("myservice").with_profile("provider");
        let resolver = CredentialResolver::new(&settings, environment);

        assert_eq!(
            resolver.resolve_for_stage("prod", None, None).profile(),
            Some("production")
        );
        assert_eq!(
            resolver.resolve_for_stage("dev", None, None).profile(),
            Some("shared")
        );
        assert_eq!(
            resolver.resolve_for_stage("prod", None, Some("cli")).profile(),
            Some("cli")
        );
    }

    #[test]
    fn test_stage_keys_require_both_halves() {
        let mut environment = EnvironmentCredentials::default();
        environment.stages.insert(
            "DEV".to_string(),
            CredentialLayer {
                profile: None,
                keys: StaticCredentials {
                    access_key_id: Some("AKIADEV".to_string()),
                    secret_access_key: None,
                    session_token: None,
                },
            },
        );
        let settings = ProviderSettings::new("myservice");
        let resolver = CredentialResolver::new(&settings, environment);

        assert!(resolver.resolve_for_stage("dev", Some("eu-west-1"), None).is_ambient());
    }

    #[test]
    fn test_static_keys_from_provider() {
        let settings = ProviderSettings::new("myservice").with_credentials(StaticCredentials {
            access_key_id: Some("AKIA".to_string()),
            secret_access_key: Some("secret".to_string()),
            session_token: Some(String::new()),
        });
        let resolver = CredentialResolver::new(&settings, EnvironmentCredentials::default());

        let credentials = resolver.resolve_for_stage("dev", None, None);
        assert_eq!(
            serde_json::to_value(&credentials).unwrap(),
            json!({
                "region": "us-east-1",
                "credentials": { "accessKeyId": "AKIA", "secretAccessKey": "secret" }
            })
        );
    }

    fn global_keys() -> EnvironmentCredentials {
        let mut environment = EnvironmentCredentials::default();
        environment.global.keys = StaticCredentials {
            access_key_id: Some("AKIAGLOBAL".to_string()),
            secret_access_key: Some("globalsecret".to_string()),
            session_token: Some("globaltoken".to_string()),
        };
        environment
    }

    #[test]
    fn test_stage_profile_replaces_global_keys() {
        let mut environment = global_keys();
        environment.stages.insert(
            "PROD".to_string(),
            CredentialLayer {
                profile: Some("production".to_string()),
                ..CredentialLayer::default()
            },
        );
        let resolver = CredentialResolver::new(&ProviderSettings::new("myservice"), environment);

        assert_eq!(
            serde_json::to_value(resolver.resolve_for_stage("prod", None, None)).unwrap(),
            json!({ "region": "us-east-1", "credentials": { "profile": "production" } })
        );
        assert_eq!(
            serde_json::to_value(resolver.resolve_for_stage("dev", None, None)).unwrap(),
            json!({
                "region": "us-east-1",
                "credentials": {
                    "accessKeyId": "AKIAGLOBAL",
                    "secretAccessKey": "globalsecret",
                    "sessionToken": "globaltoken"
                }
            })
        );
    }

    #[test]
    fn test_override_profile_replaces_global_keys() {
        let resolver = CredentialResolver::new(&ProviderSettings::new("myservice"), global_keys());

        let credentials = resolver.resolve_for_stage("dev", None, Some("cli"));
        assert_eq!(
            serde_json::to_value(&credentials).unwrap(),
            json!({ "region": "us-east-1", "credentials": { "profile": "cli" } })
        );
    }

    #[test]
    fn test_stage_keys_replace_provider_profile() {
        let mut environment = EnvironmentCredentials::default();
        environment.stages.insert(
            "DEV".to_string(),
            CredentialLayer {
                profile: None,
                keys: StaticCredentials {
                    access_key_id: Some("AKIADEV".to_string()),
                    secret_access_key: Some("devsecret".to_string()),
                    session_token: None,
                },
            },
        );
        let settings = ProviderSettings::new("myservice").with_profile("provider");
        let resolver = CredentialResolver::new(&settings, environment);

        let credentials = resolver.resolve_for_stage("dev", None, None);
        assert_eq!(credentials.profile(), None);
        assert_eq!(
            credentials.credentials.and_then(|c| c.access_key_id).as_deref(),
            Some("AKIADEV")
        );
        assert_eq!(resolver.default_region(), "us-east-1");
    }

    #[test]
    fn test_stage_resolution_without_layers_matches_resolve() {
        let resolver = resolver(None);
        assert_eq!(
            resolver.resolve_for_stage("dev", Some("testregion"), None),
            resolver.resolve(Some("testregion"), None)
        );
    }
}
