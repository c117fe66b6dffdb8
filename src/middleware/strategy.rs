//! Strategy dispatch middleware.
//!
//! For each request this middleware asks the registered providers whether the
//! path is one of their request or callback paths. The first match is set up
//! for the request:
//!
//! - on success, an [`ActiveStrategy`] extension carrying the provider's
//!   resolved options is attached and the request continues
//! - on a tenant resolution failure, the request is short-circuited: browsers
//!   are redirected to the failure path, API clients get a JSON 401
//!
//! Requests no provider claims pass through untouched.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::Instrument;

use crate::auth::{
    ProviderTable, RequestContext, SetupOutcome, StrategyFailure, StrategyOptions, StrategyPhase,
};

/// The strategy selected for the current request, with its per-request options.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveStrategy {
    pub provider: String,
    pub phase: StrategyPhase,
    pub tenant_id: Option<String>,
    pub options: StrategyOptions,
}

pub async fn strategy_middleware(
    State(providers): State<ProviderTable>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let mut context = RequestContext::from_parts(&parts);

    let Some((provider, phase)) = providers.dispatch(&context) else {
        return next.run(Request::from_parts(parts, body)).await;
    };

    *context.options_mut() = provider.static_options().clone();

    let span = tracing::debug_span!(
        "strategy_setup",
        provider = %provider.name(),
        phase = ?phase,
        path = %context.path(),
    );
    let outcome = (provider.hooks().setup)(&mut context)
        .instrument(span)
        .await;

    let tenant_id = match outcome {
        SetupOutcome::Configured { tenant_id } => Some(tenant_id),
        SetupOutcome::Skipped => None,
        SetupOutcome::Failed(failure) => {
            tracing::warn!(
                provider = %provider.name(),
                tenant_id = %failure.tenant_id(),
                reason = %failure.reason(),
                error = %failure.error(),
                "Authentication strategy setup failed"
            );
            return failure_response(
                failure,
                provider.name(),
                providers.failure_path(),
                &parts.headers,
            );
        }
    };

    tracing::debug!(
        provider = %provider.name(),
        phase = ?phase,
        tenant_id = ?tenant_id,
        "Dispatching request to authentication strategy"
    );

    parts.extensions.insert(ActiveStrategy {
        provider: provider.name().to_string(),
        phase,
        tenant_id,
        options: context.into_options(),
    });

    next.run(Request::from_parts(parts, body)).await
}

/// Translate a strategy failure into the host's short-circuit response.
fn failure_response(
    failure: StrategyFailure,
    provider: &str,
    failure_path: &str,
    headers: &HeaderMap,
) -> Response {
    if is_xhr_request(headers) {
        return failure.into_response();
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("message", failure.reason().as_str())
        .append_pair("strategy", provider)
        .finish();
    let separator = if failure_path.contains('?') { '&' } else { '?' };
    let location = format!("{failure_path}{separator}{query}");

    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Check if this is an XHR/API request (should get JSON, not a redirect).
fn is_xhr_request(headers: &HeaderMap) -> bool {
    if headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    {
        return true;
    }

    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json") && !accept.contains("text/html"))
}
