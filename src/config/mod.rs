//! Configuration for the multi-provider server.
//!
//! Configured via a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [[providers]]
//! name = "saml"
//! path_prefix = "/auth/saml"
//! tenant_id_pattern = "\\d+"
//!
//! [providers.options]
//! sp_entity_id = "${SP_ENTITY_ID}"
//!
//! [providers.tenants.12345]
//! idp_sso_target_url = "https://idp.example.com/sso"
//! ```

mod observability;
mod providers;
mod server;

use std::{path::Path, sync::LazyLock};

pub use observability::*;
pub use providers::*;
use serde::{Deserialize, Serialize};
pub use server::*;

use crate::auth::ConfigurationError;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Settings shared by all strategies.
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Multi-tenant provider registrations.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: AppConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::Validation(
                "At least one [[providers]] entry is required".into(),
            ));
        }

        for (i, provider) in self.providers.iter().enumerate() {
            if self.providers[..i].iter().any(|p| p.name == provider.name) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate provider name '{}'",
                    provider.name
                )));
            }
            provider.validate()?;
        }

        self.strategy.validate()?;

        // A failure path inside a provider's namespace would be dispatched
        // back into that provider instead of reaching the failure page.
        for provider in &self.providers {
            if provider
                .matcher()?
                .classify(&self.strategy.failure_path)
                .is_some()
            {
                return Err(ConfigError::Validation(format!(
                    "strategy.failure_path '{}' is claimed by provider '{}'",
                    self.strategy.failure_path, provider.name
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Invalid provider registration: {0}")]
    Registration(#[from] ConfigurationError),
}

static ENV_VAR_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Expand `${VAR}` references, leaving anything after a `#` comment alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR_PATTERN.captures_iter(line) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let value = std::env::var(name.as_str())
                .map_err(|_| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"
        [[providers]]
        name = "saml"
        tenant_id_pattern = "\\d+"
    "#;

    #[test]
    fn test_minimal_config() {
        let config = AppConfig::from_str(MINIMAL).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.strategy.failure_path, "/auth/failure");
        let provider = &config.providers[0];
        assert_eq!(provider.name, "saml");
        assert_eq!(provider.path_prefix, "/auth");
        assert_eq!(provider.callback_suffix, "callback");
        assert!(provider.options.is_empty());
        assert!(provider.tenants.is_empty());
    }

    #[test]
    fn test_full_provider_config() {
        let config = AppConfig::from_str(
            r#"
            [strategy]
            failure_path = "/login/failed"

            [[providers]]
            name = "saml"
            path_prefix = "/auth/saml"
            tenant_id_pattern = "\\d+"
            callback_suffix = "acs"

            [providers.options]
            sp_entity_id = "https://sp.example.com"
            allowed_clock_drift = 5

            [providers.tenants.12345]
            idp_sso_target_url = "https://idp.acme.test/sso"

            [providers.tenants.67890]
        "#,
        )
        .unwrap();

        assert_eq!(config.strategy.failure_path, "/login/failed");
        let provider = &config.providers[0];
        assert_eq!(provider.callback_suffix, "acs");
        assert_eq!(provider.options["sp_entity_id"], "https://sp.example.com");
        assert_eq!(provider.options["allowed_clock_drift"], 5);
        assert_eq!(
            provider.tenants["12345"]["idp_sso_target_url"],
            "https://idp.acme.test/sso"
        );
        assert!(provider.tenants["67890"].is_empty());
    }

    #[test]
    fn test_no_providers_rejected() {
        let err = AppConfig::from_str("[server]\nport = 8080\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let err = AppConfig::from_str(
            r#"
            [[providers]]
            name = "saml"
            tenant_id_pattern = "\\d+"

            [[providers]]
            name = "saml"
            path_prefix = "/other"
            tenant_id_pattern = "\\d+"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Duplicate provider name 'saml'"));
    }

    #[test]
    fn test_invalid_pattern_rejected_at_load() {
        let err = AppConfig::from_str(
            r#"
            [[providers]]
            name = "saml"
            tenant_id_pattern = "(\\d+"
        "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registration(ConfigurationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_failure_path_inside_provider_namespace_rejected() {
        let err = AppConfig::from_str(
            r#"
            [strategy]
            failure_path = "/auth/failure"

            [[providers]]
            name = "oidc"
            tenant_id_pattern = "[a-z]+"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("claimed by provider 'oidc'"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = AppConfig::from_str(
            r#"
            [[providers]]
            name = "saml"
            tenant_id_pattern = "\\d+"
            tenant_regex = "\\d+"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("MP_TEST_SP_ENTITY_ID", Some("https://sp.from-env.test"), || {
            let config = AppConfig::from_str(
                r#"
                [[providers]]
                name = "saml"
                tenant_id_pattern = "\\d+"

                [providers.options]
                sp_entity_id = "${MP_TEST_SP_ENTITY_ID}" # not ${EXPANDED_IN_COMMENT}
            "#,
            )
            .unwrap();
            assert_eq!(
                config.providers[0].options["sp_entity_id"],
                "https://sp.from-env.test"
            );
        });
    }

    #[test]
    fn test_missing_env_var() {
        temp_env::with_var_unset("MP_TEST_MISSING_VAR", || {
            let err = AppConfig::from_str(
                r#"
                [[providers]]
                name = "${MP_TEST_MISSING_VAR}"
                tenant_id_pattern = "\\d+"
            "#,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "MP_TEST_MISSING_VAR"));
        });
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.providers.len(), 1);

        let err = AppConfig::from_file("/nonexistent/multi-provider.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
