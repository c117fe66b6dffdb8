//! Router assembly for the multi-provider server.

use axum::{
    Extension, Json, Router,
    extract::Query,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{ProviderBuilder, ProviderTable, register},
    config::{AppConfig, ConfigError},
    middleware::{ActiveStrategy, strategy_middleware},
};

/// Register every configured provider and return the dispatch table.
pub fn build_provider_table(config: &AppConfig) -> Result<ProviderTable, ConfigError> {
    let mut builder = ProviderBuilder::new().failure_path(&config.strategy.failure_path);

    for provider in &config.providers {
        register(&mut builder, provider.to_registration())?;
    }

    Ok(builder.build())
}

/// Build the application router.
///
/// Every request runs through [`strategy_middleware`]. Requests it activates a
/// strategy for are answered with that strategy as JSON; anything else is 404.
pub fn build_app(config: &AppConfig) -> Result<Router, ConfigError> {
    let providers = build_provider_table(config)?;
    tracing::info!(
        providers = providers.providers().count(),
        failure_path = %providers.failure_path(),
        "Registered authentication providers"
    );

    Ok(Router::new()
        .route(&config.strategy.failure_path, get(strategy_failure))
        .fallback(active_strategy)
        .layer(middleware::from_fn_with_state(
            providers,
            strategy_middleware,
        )))
}

async fn active_strategy(strategy: Option<Extension<ActiveStrategy>>) -> Response {
    match strategy {
        Some(Extension(strategy)) => Json(strategy).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Query parameters the strategy middleware appends to failure redirects.
#[derive(Debug, Deserialize, Serialize)]
struct FailureParams {
    message: Option<String>,
    strategy: Option<String>,
}

async fn strategy_failure(Query(params): Query<FailureParams>) -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(params))
}
