mod context;
mod error;
mod path_matcher;
mod provider_resolver;
mod registration;
mod registry;
mod static_resolver;

pub use context::{RequestContext, StrategyOptions, StrategyPhase};
pub use error::{
    BoxError, ConfigurationError, ErrorInfo, ErrorResponse, FailureReason, InvalidTenantError,
    StrategyFailure,
};
pub use path_matcher::PathMatcher;
pub use provider_resolver::{
    CALLBACK_PATH_OPTION, DEFAULT_CALLBACK_SUFFIX, DEFAULT_PATH_PREFIX, FnResolver,
    ProviderResolver, ProviderResolverBuilder, REQUEST_PATH_OPTION, SetupOutcome,
    SharedTenantConfigResolver, TenantConfigResolver, resolver_fn,
};
pub use registration::{Registration, SETUP_OPTION, register};
pub use registry::{
    DEFAULT_FAILURE_PATH, PathPredicate, ProviderBuilder, ProviderHooks, ProviderOptions,
    ProviderTable, RegisteredProvider, SetupHook,
};
pub use static_resolver::{StaticTenantResolver, UnknownTenant};
