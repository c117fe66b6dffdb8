use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::auth::{
    ConfigurationError, DEFAULT_CALLBACK_SUFFIX, DEFAULT_FAILURE_PATH, DEFAULT_PATH_PREFIX,
    PathMatcher, Registration, StaticTenantResolver, StrategyOptions,
};

/// Settings shared by every registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Where browsers are redirected when a strategy fails.
    /// The redirect carries `message` and `strategy` query parameters.
    #[serde(default = "default_failure_path")]
    pub failure_path: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            failure_path: default_failure_path(),
        }
    }
}

impl StrategyConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if !self.failure_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "strategy.failure_path must start with '/', got '{}'",
                self.failure_path
            )));
        }

        // Served as a literal axum route; query strings are appended by the redirect.
        if self.failure_path.contains(['?', '#', '{', '}', '*'])
            || self.failure_path.split('/').any(|segment| segment.starts_with(':'))
        {
            return Err(ConfigError::Validation(format!(
                "strategy.failure_path must be a plain path, got '{}'",
                self.failure_path
            )));
        }

        Ok(())
    }
}

fn default_failure_path() -> String {
    DEFAULT_FAILURE_PATH.to_string()
}

/// One multi-tenant provider registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider name, used in failure redirects and logs.
    pub name: String,

    /// Path segment shared by all tenants of this provider.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Regular expression matching a bare tenant id (no slashes).
    /// Classes are Unicode-aware: prefer `[0-9]+` over `\d+` for ASCII digits.
    pub tenant_id_pattern: String,

    /// Final path segment of the callback phase, matched literally.
    #[serde(default = "default_callback_suffix")]
    pub callback_suffix: String,

    /// Static options passed through to the strategy for every tenant.
    #[serde(default)]
    pub options: StrategyOptions,

    /// Known tenants and their options. Any other tenant id is rejected
    /// with `invalid_identity_provider`.
    #[serde(default)]
    pub tenants: BTreeMap<String, StrategyOptions>,
}

impl ProviderConfig {
    /// Compile the path patterns so bad patterns fail at load time.
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Provider name must not be empty".into(),
            ));
        }

        self.matcher()?;

        if self.callback_suffix.is_empty() {
            tracing::warn!(
                provider = %self.name,
                "Empty callback_suffix: request and callback paths overlap"
            );
        }

        Ok(())
    }

    /// Compiled request/callback path matcher for this provider.
    pub fn matcher(&self) -> Result<PathMatcher, ConfigurationError> {
        PathMatcher::compile(
            &self.path_prefix,
            &self.tenant_id_pattern,
            &self.callback_suffix,
        )
    }

    /// Registration for this provider, resolving tenants from the `tenants` table.
    pub fn to_registration(&self) -> Registration {
        Registration::new(&self.name)
            .path_prefix(&self.path_prefix)
            .tenant_id_pattern(&self.tenant_id_pattern)
            .callback_suffix(&self.callback_suffix)
            .options(self.options.clone())
            .resolver(StaticTenantResolver::new(self.tenants.clone()))
    }
}

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}

fn default_callback_suffix() -> String {
    DEFAULT_CALLBACK_SUFFIX.to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::auth::{ProviderBuilder, register};

    fn provider() -> ProviderConfig {
        ProviderConfig {
            name: "saml".to_string(),
            path_prefix: "/auth/saml".to_string(),
            tenant_id_pattern: r"\d+".to_string(),
            callback_suffix: "callback".to_string(),
            options: StrategyOptions::new(),
            tenants: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = ProviderConfig {
            name: " ".to_string(),
            ..provider()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_failure_path_must_be_absolute() {
        let config = StrategyConfig {
            failure_path: "auth/failure".to_string(),
        };
        assert!(config.validate().is_err());
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case::query("/auth/failure?source=sso")]
    #[case::fragment("/auth/failure#top")]
    #[case::capture("/auth/{reason}")]
    #[case::unclosed_capture("/auth/{")]
    #[case::wildcard("/a/*x")]
    #[case::legacy_capture("/auth/:reason")]
    fn test_failure_path_must_be_plain(#[case] failure_path: &str) {
        let config = StrategyConfig {
            failure_path: failure_path.to_string(),
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_to_registration() {
        let mut builder = ProviderBuilder::new();
        let handler = register(&mut builder, provider().to_registration()).unwrap();

        assert_eq!(handler.matcher().path_prefix(), "/auth/saml");
        let table = builder.build();
        assert_eq!(
            table.get("saml").unwrap().static_options()["path_prefix"],
            "/auth/saml"
        );
    }
}
