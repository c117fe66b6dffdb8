//! Per-request tenant resolution for a shared authentication strategy.
//!
//! A [`ProviderResolver`] lets one strategy registration serve every tenant
//! whose id appears in the request path. For each request routed to the
//! strategy, [`ProviderResolver::setup`]:
//!
//! 1. extracts the tenant id from the path (no id: nothing happens)
//! 2. sets the tenant's concrete `request_path` and `callback_path` options
//! 3. asks the tenant configuration resolver for the tenant's options and
//!    merges them in, or reports `invalid_identity_provider` if it fails
//!
//! # Usage
//!
//! ```rust,ignore
//! let resolver = ProviderResolver::builder()
//!     .path_prefix("/auth/saml")
//!     .tenant_id_pattern(r"\d+")
//!     .resolver(resolver_fn(|tenant_id, _request| {
//!         let mut options = StrategyOptions::new();
//!         options.insert("idp_sso_target_url".into(), sso_url_for(tenant_id)?.into());
//!         Ok(Some(options))
//!     }))
//!     .build()?;
//! ```

use std::{fmt, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;

use super::{
    BoxError, ConfigurationError, InvalidTenantError, PathMatcher, ProviderHooks,
    RequestContext, StrategyFailure, StrategyOptions,
};

/// Path prefix used when a registration does not specify one.
pub const DEFAULT_PATH_PREFIX: &str = "/auth";

/// Callback suffix used when a registration does not specify one.
pub const DEFAULT_CALLBACK_SUFFIX: &str = "callback";

/// Option key holding the tenant's concrete request path.
pub const REQUEST_PATH_OPTION: &str = "request_path";

/// Option key holding the tenant's concrete callback path.
pub const CALLBACK_PATH_OPTION: &str = "callback_path";

/// Supplies per-tenant strategy options.
///
/// This is the sole authority on which tenants exist: returning an error marks
/// the tenant as invalid for this request. Called once per `setup`, with no
/// caching, timeout or retry applied by the caller; wrap the resolver if you
/// need any of those.
#[async_trait]
pub trait TenantConfigResolver: Send + Sync {
    /// Resolve the options for `tenant_id`. `Ok(None)` means "no extra options".
    async fn resolve(
        &self,
        tenant_id: &str,
        request: &RequestContext,
    ) -> Result<Option<StrategyOptions>, BoxError>;
}

/// Shared handle to a tenant configuration resolver.
pub type SharedTenantConfigResolver = Arc<dyn TenantConfigResolver>;

/// Adapter that lets a plain closure act as a [`TenantConfigResolver`].
pub struct FnResolver<F>(F);

/// Wrap a synchronous closure as a tenant configuration resolver.
pub fn resolver_fn<F>(f: F) -> FnResolver<F>
where
    F: Fn(&str, &RequestContext) -> Result<Option<StrategyOptions>, BoxError> + Send + Sync,
{
    FnResolver(f)
}

#[async_trait]
impl<F> TenantConfigResolver for FnResolver<F>
where
    F: Fn(&str, &RequestContext) -> Result<Option<StrategyOptions>, BoxError> + Send + Sync,
{
    async fn resolve(
        &self,
        tenant_id: &str,
        request: &RequestContext,
    ) -> Result<Option<StrategyOptions>, BoxError> {
        (self.0)(tenant_id, request)
    }
}

/// Result of running `setup` for one request.
#[derive(Debug)]
pub enum SetupOutcome {
    /// The path carried no tenant id; the options were left untouched.
    Skipped,
    /// Path options were set and the tenant's options merged.
    Configured { tenant_id: String },
    /// The resolver rejected the tenant. Path options were still set.
    Failed(StrategyFailure),
}

impl SetupOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SetupOutcome::Failed(_))
    }

    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            SetupOutcome::Skipped => None,
            SetupOutcome::Configured { tenant_id } => Some(tenant_id),
            SetupOutcome::Failed(failure) => Some(failure.tenant_id()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Tenant configuration resolver panicked: {0}")]
struct ResolverPanicked(String);

/// Routes requests for one strategy registration to per-tenant configuration.
///
/// All state is fixed at construction, so a single instance is shared by
/// every concurrently handled request.
pub struct ProviderResolver {
    matcher: PathMatcher,
    resolver: SharedTenantConfigResolver,
}

impl fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderResolver")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

impl ProviderResolver {
    pub fn builder() -> ProviderResolverBuilder {
        ProviderResolverBuilder::default()
    }

    /// Create a resolver, compiling the path patterns immediately.
    pub fn new(
        path_prefix: &str,
        tenant_id_pattern: &str,
        callback_suffix: &str,
        resolver: SharedTenantConfigResolver,
    ) -> Result<Self, ConfigurationError> {
        let matcher = PathMatcher::compile(path_prefix, tenant_id_pattern, callback_suffix)?;
        Ok(Self { matcher, resolver })
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    pub fn is_request_path(&self, request: &RequestContext) -> bool {
        self.matcher.is_request_path(request.path())
    }

    pub fn is_callback_path(&self, request: &RequestContext) -> bool {
        self.matcher.is_callback_path(request.path())
    }

    pub fn extract_tenant_id<'a>(&self, request: &'a RequestContext) -> Option<&'a str> {
        self.matcher.extract_tenant_id(request.path())
    }

    /// Inject the tenant's path and resolver options into `request`.
    ///
    /// Never returns the resolver's error directly: a failing (or panicking)
    /// resolver yields [`SetupOutcome::Failed`] for the host to short-circuit on.
    pub async fn setup(&self, request: &mut RequestContext) -> SetupOutcome {
        let Some(tenant_id) = self.extract_tenant_id(request).map(str::to_string) else {
            tracing::trace!(path = %request.path(), "No tenant id in path, skipping setup");
            return SetupOutcome::Skipped;
        };

        self.add_path_options(request, &tenant_id);

        match self.resolve_tenant_options(&tenant_id, request).await {
            Ok(Some(options)) => {
                tracing::debug!(
                    tenant_id = %tenant_id,
                    option_count = options.len(),
                    "Resolved identity provider options"
                );
                request.options_mut().extend(options);
            }
            Ok(None) => {
                tracing::debug!(tenant_id = %tenant_id, "Identity provider has no extra options");
            }
            Err(source) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    error = %source,
                    "Failed to resolve identity provider options"
                );
                return SetupOutcome::Failed(StrategyFailure::invalid_identity_provider(
                    InvalidTenantError { tenant_id, source },
                ));
            }
        }

        SetupOutcome::Configured { tenant_id }
    }

    /// Hooks bound to this resolver, in the shape the provider builder expects.
    pub fn provider_options(self: &Arc<Self>) -> ProviderHooks {
        ProviderHooks::from_resolver(Arc::clone(self))
    }

    fn add_path_options(&self, request: &mut RequestContext, tenant_id: &str) {
        let options = request.options_mut();
        options.insert(
            REQUEST_PATH_OPTION.to_string(),
            self.matcher.request_path_for(tenant_id).into(),
        );
        options.insert(
            CALLBACK_PATH_OPTION.to_string(),
            self.matcher.callback_path_for(tenant_id).into(),
        );
    }

    async fn resolve_tenant_options(
        &self,
        tenant_id: &str,
        request: &RequestContext,
    ) -> Result<Option<StrategyOptions>, BoxError> {
        AssertUnwindSafe(self.resolver.resolve(tenant_id, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ResolverPanicked(panic_message(&*panic)).into()))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`ProviderResolver`].
#[derive(Default)]
pub struct ProviderResolverBuilder {
    path_prefix: Option<String>,
    tenant_id_pattern: Option<String>,
    callback_suffix: Option<String>,
    resolver: Option<SharedTenantConfigResolver>,
}

impl ProviderResolverBuilder {
    /// Path segment shared by all tenants. Defaults to `/auth`.
    pub fn path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(path_prefix.into());
        self
    }

    /// Regular expression fragment matching a bare tenant id (no slashes).
    pub fn tenant_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.tenant_id_pattern = Some(pattern.into());
        self
    }

    /// Final path segment of the callback phase. Defaults to `callback`.
    pub fn callback_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.callback_suffix = Some(suffix.into());
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

    pub fn build(self) -> Result<ProviderResolver, ConfigurationError> {
        let resolver = self.resolver.ok_or(ConfigurationError::MissingResolver)?;
        let tenant_id_pattern = self
            .tenant_id_pattern
            .ok_or(ConfigurationError::MissingTenantIdPattern)?;

        ProviderResolver::new(
            self.path_prefix.as_deref().unwrap_or(DEFAULT_PATH_PREFIX),
            &tenant_id_pattern,
            self.callback_suffix
                .as_deref()
                .unwrap_or(DEFAULT_CALLBACK_SUFFIX),
            resolver,
        )
    }
}
