//! Provider table for the host strategy middleware.
//!
//! Providers are added to a [`ProviderBuilder`] at startup, each with its
//! static options and the three hooks the middleware consults per request.
//! The finished [`ProviderTable`] is immutable and cheap to clone.
//!
//! ```rust,ignore
//! let mut builder = ProviderBuilder::new().failure_path("/auth/failure");
//! register(&mut builder, Registration::new("saml").tenant_id_pattern(r"\d+").resolver(resolver))?;
//! let providers = builder.build();
//!
//! let app = Router::new()
//!     .fallback(handler)
//!     .layer(axum::middleware::from_fn_with_state(providers, strategy_middleware));
//! ```

use std::{fmt, sync::Arc};

use futures::future::BoxFuture;

use super::{
    ConfigurationError, ProviderResolver, RequestContext, SetupOutcome, StrategyOptions,
    StrategyPhase,
};

/// Path the failure redirect points to when none is configured.
pub const DEFAULT_FAILURE_PATH: &str = "/auth/failure";

/// Predicate deciding whether a request belongs to a provider's phase.
pub type PathPredicate = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// Per-request setup hook. Runs once per dispatched request.
pub type SetupHook =
    Arc<dyn for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, SetupOutcome> + Send + Sync>;

/// The hooks a provider exposes to the middleware.
#[derive(Clone)]
pub struct ProviderHooks {
    pub request_path: PathPredicate,
    pub callback_path: PathPredicate,
    pub setup: SetupHook,
}

impl ProviderHooks {
    /// Bind all three hooks to a shared provider resolver.
    pub fn from_resolver(resolver: Arc<ProviderResolver>) -> Self {
        let request = Arc::clone(&resolver);
        let callback = Arc::clone(&resolver);

        Self {
            request_path: Arc::new(move |ctx: &RequestContext| request.is_request_path(ctx)),
            callback_path: Arc::new(move |ctx: &RequestContext| callback.is_callback_path(ctx)),
            setup: Arc::new(setup_hook(move |ctx| {
                let resolver = Arc::clone(&resolver);
                Box::pin(async move { resolver.setup(ctx).await })
            })),
        }
    }

    /// Classify a request against this provider's predicates.
    pub fn phase(&self, request: &RequestContext) -> Option<StrategyPhase> {
        if (self.request_path)(request) {
            Some(StrategyPhase::Request)
        } else if (self.callback_path)(request) {
            Some(StrategyPhase::Callback)
        } else {
            None
        }
    }
}

impl fmt::Debug for ProviderHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHooks").finish_non_exhaustive()
    }
}

// Pins the closure to the higher-ranked signature `SetupHook` requires.
fn setup_hook<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, SetupOutcome> + Send + Sync,
{
    f
}

/// Options a provider is registered with: static pass-through options plus hooks.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub static_options: StrategyOptions,
    pub hooks: ProviderHooks,
}

/// A named provider in the table.
#[derive(Debug, Clone)]
pub struct RegisteredProvider {
    name: String,
    options: ProviderOptions,
}

impl RegisteredProvider {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    pub fn static_options(&self) -> &StrategyOptions {
        &self.options.static_options
    }

    pub fn hooks(&self) -> &ProviderHooks {
        &self.options.hooks
    }
}

/// Collects provider registrations before serving traffic.
#[derive(Debug, Default)]
pub struct ProviderBuilder {
    providers: Vec<RegisteredProvider>,
    failure_path: Option<String>,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path browsers are redirected to when a strategy fails.
    pub fn failure_path(mut self, path: impl Into<String>) -> Self {
        self.failure_path = Some(path.into());
        self
    }

    /// Add a provider. Names must be unique.
    pub fn provider(
        &mut self,
        name: impl Into<String>,
        options: ProviderOptions,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if self.providers.iter().any(|p| p.name == name) {
            return Err(ConfigurationError::DuplicateProvider(name));
        }

        tracing::info!(provider = %name, "Registered authentication provider");
        self.providers.push(RegisteredProvider { name, options });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn build(self) -> ProviderTable {
        ProviderTable {
            inner: Arc::new(ProviderTableInner {
                providers: self.providers,
                failure_path: self
                    .failure_path
                    .unwrap_or_else(|| DEFAULT_FAILURE_PATH.to_string()),
            }),
        }
    }
}

/// Immutable set of registered providers, shared by every request.
#[derive(Debug, Clone)]
pub struct ProviderTable {
    inner: Arc<ProviderTableInner>,
}

#[derive(Debug)]
struct ProviderTableInner {
    providers: Vec<RegisteredProvider>,
    failure_path: String,
}

impl ProviderTable {
    /// Providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.inner.providers.iter()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredProvider> {
        self.inner.providers.iter().find(|p| p.name == name)
    }

    pub fn failure_path(&self) -> &str {
        &self.inner.failure_path
    }

    /// Find the first provider whose request or callback predicate accepts `request`.
    pub fn dispatch(
        &self,
        request: &RequestContext,
    ) -> Option<(&RegisteredProvider, StrategyPhase)> {
        self.inner
            .providers
            .iter()
            .find_map(|provider| provider.hooks().phase(request).map(|phase| (provider, phase)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolver_fn;

    fn provider_options(prefix: &str) -> ProviderOptions {
        let resolver = ProviderResolver::builder()
            .path_prefix(prefix)
            .tenant_id_pattern(r"\d+")
            .resolver(resolver_fn(|_, _| Ok(None)))
            .build()
            .unwrap();

        ProviderOptions {
            static_options: StrategyOptions::new(),
            hooks: Arc::new(resolver).provider_options(),
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut builder = ProviderBuilder::new();
        builder.provider("saml", provider_options("/auth/saml")).unwrap();

        let err = builder
            .provider("saml", provider_options("/auth/other"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateProvider(name) if name == "saml"));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let mut builder = ProviderBuilder::new();
        builder.provider("saml", provider_options("/auth/saml")).unwrap();
        builder.provider("oidc", provider_options("/auth/oidc")).unwrap();
        let table = builder.build();

        let (provider, phase) = table
            .dispatch(&RequestContext::new("/auth/oidc/7/callback"))
            .unwrap();
        assert_eq!(provider.name(), "oidc");
        assert_eq!(phase, StrategyPhase::Callback);

        let (provider, phase) = table.dispatch(&RequestContext::new("/auth/saml/7")).unwrap();
        assert_eq!(provider.name(), "saml");
        assert_eq!(phase, StrategyPhase::Request);

        assert!(table.dispatch(&RequestContext::new("/auth/saml/7/extra")).is_none());
        assert!(table.dispatch(&RequestContext::new("/health")).is_none());
    }

    #[test]
    fn test_failure_path_default() {
        let table = ProviderBuilder::new().build();
        assert_eq!(table.failure_path(), DEFAULT_FAILURE_PATH);

        let table = ProviderBuilder::new().failure_path("/login/failed").build();
        assert_eq!(table.failure_path(), "/login/failed");
        assert!(table.get("saml").is_none());
    }

    #[tokio::test]
    async fn test_setup_hook_runs_bound_resolver() {
        let hooks = provider_options("/auth/saml").hooks;
        let mut request = RequestContext::new("/auth/saml/99");

        let outcome = (hooks.setup)(&mut request).await;

        assert_eq!(outcome.tenant_id(), Some("99"));
        assert_eq!(request.options()["callback_path"], "/auth/saml/99/callback");
    }
}
