//! Multi-tenant path routing and per-request configuration for
//! authentication strategies.
//!
//! A single registered strategy (for example SAML) serves many tenants,
//! each addressed by an id embedded in the URL:
//!
//! ```text
//! /auth/saml/12345           request phase for tenant 12345
//! /auth/saml/12345/callback  callback phase for tenant 12345
//! ```
//!
//! [`auth::register`] wires a strategy to a [`auth::ProviderResolver`] that
//! recognizes these paths, extracts the tenant id and merges the tenant's
//! options into the request before the strategy runs.
//! [`middleware::strategy_middleware`] hosts the registered strategies in an
//! axum router.

pub mod auth;
pub mod config;
pub mod middleware;
#[cfg(feature = "server")]
pub mod observability;
pub mod server;

#[cfg(test)]
mod tests;
