//! Registration entry point: one strategy, many path-addressed tenants.

use std::sync::Arc;

use serde_json::Value;

use super::{
    CALLBACK_PATH_OPTION, ConfigurationError, DEFAULT_CALLBACK_SUFFIX, DEFAULT_PATH_PREFIX,
    ProviderBuilder, ProviderOptions, ProviderResolver, REQUEST_PATH_OPTION,
    SharedTenantConfigResolver, StrategyOptions, TenantConfigResolver,
};

/// Option key reserved for the setup hook.
pub const SETUP_OPTION: &str = "setup";

/// Option keys always supplied by the hooks; static options may not override them.
const RESERVED_OPTIONS: [&str; 3] = [REQUEST_PATH_OPTION, CALLBACK_PATH_OPTION, SETUP_OPTION];

/// Everything needed to register a multi-tenant provider.
pub struct Registration {
    provider_name: String,
    path_prefix: String,
    tenant_id_pattern: Option<String>,
    callback_suffix: String,
    static_options: StrategyOptions,
    resolver: Option<SharedTenantConfigResolver>,
}

impl Registration {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            tenant_id_pattern: None,
            callback_suffix: DEFAULT_CALLBACK_SUFFIX.to_string(),
            static_options: StrategyOptions::new(),
            resolver: None,
        }
    }

    pub fn path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = path_prefix.into();
        self
    }

    pub fn tenant_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.tenant_id_pattern = Some(pattern.into());
        self
    }

    pub fn callback_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.callback_suffix = suffix.into();
        self
    }

    /// Add a static option passed straight through to the strategy.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.static_options.insert(key.into(), value.into());
        self
    }

    /// Add several static options at once.
    pub fn options(mut self, options: StrategyOptions) -> Self {
        self.static_options.extend(options);
        self
    }

    pub fn resolver(mut self, resolver: impl TenantConfigResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn shared_resolver(mut self, resolver: SharedTenantConfigResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

/// Build a [`ProviderResolver`] and register it with `builder`.
///
/// The provider is registered with the static options, the path template
/// (`path_prefix`, `tenant_id_pattern`, `callback_suffix`) and the three hooks.
/// Static options named like a hook are dropped; the hooks win.
pub fn register(
    builder: &mut ProviderBuilder,
    registration: Registration,
) -> Result<Arc<ProviderResolver>, ConfigurationError> {
    let Registration {
        provider_name,
        path_prefix,
        tenant_id_pattern,
        callback_suffix,
        mut static_options,
        resolver,
    } = registration;

    let resolver = resolver.ok_or(ConfigurationError::MissingResolver)?;
    let tenant_id_pattern = tenant_id_pattern.ok_or(ConfigurationError::MissingTenantIdPattern)?;

    let handler = Arc::new(ProviderResolver::new(
        &path_prefix,
        &tenant_id_pattern,
        &callback_suffix,
        resolver,
    )?);

    for key in RESERVED_OPTIONS {
        if static_options.remove(key).is_some() {
            tracing::warn!(
                provider = %provider_name,
                option = key,
                "Static option collides with a provider hook and was ignored"
            );
        }
    }
    static_options.insert("path_prefix".to_string(), path_prefix.into());
    static_options.insert("tenant_id_pattern".to_string(), tenant_id_pattern.into());
    static_options.insert("callback_suffix".to_string(), callback_suffix.into());

    builder.provider(
        provider_name,
        ProviderOptions {
            static_options,
            hooks: handler.provider_options(),
        },
    )?;

    Ok(handler)
}
