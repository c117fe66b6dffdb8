//! Tenant configuration served from a fixed table.
//!
//! Used by the demo server, where tenants come from the config file. Real
//! deployments typically plug in a resolver backed by a database or an IdP
//! metadata service instead.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{BoxError, RequestContext, StrategyOptions, TenantConfigResolver};

/// The requested tenant is not in the table.
#[derive(Debug, thiserror::Error)]
#[error("Unknown identity provider '{0}'")]
pub struct UnknownTenant(pub String);

/// Resolves tenants from an in-memory map of tenant id to options.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantResolver {
    tenants: BTreeMap<String, StrategyOptions>,
}

impl StaticTenantResolver {
    pub fn new(tenants: BTreeMap<String, StrategyOptions>) -> Self {
        Self { tenants }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>, options: StrategyOptions) -> Self {
        self.tenants.insert(tenant_id.into(), options);
        self
    }

    pub fn tenant_ids(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }
}

#[async_trait]
impl TenantConfigResolver for StaticTenantResolver {
    async fn resolve(
        &self,
        tenant_id: &str,
        _request: &RequestContext,
    ) -> Result<Option<StrategyOptions>, BoxError> {
        match self.tenants.get(tenant_id) {
            Some(options) => Ok(Some(options.clone())),
            None => Err(UnknownTenant(tenant_id.to_string()).into()),
        }
    }
}
