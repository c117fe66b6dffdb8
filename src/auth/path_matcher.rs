//! Path classification for multi-tenant strategies.
//!
//! A [`PathMatcher`] is compiled once from a path prefix, a tenant id pattern
//! and a callback suffix. Given `/auth/saml`, `\d+` and `callback` it
//! recognises:
//!
//! - `/auth/saml/12345` and `/auth/saml/12345/` as request-phase paths
//! - `/auth/saml/12345/callback` (optionally with a trailing slash) as callback-phase paths
//! - any path starting with `/auth/saml/<digits>` as belonging to that tenant
//!
//! The prefix and tenant id pattern are embedded as regular expression
//! fragments; the callback suffix is matched literally. All patterns are
//! anchored to the start of the path.
//!
//! Fragments use Unicode-aware classes: `\d` also accepts non-ASCII digits
//! such as `١٢٣`. Use `[0-9]` or `(?-u:\d)` for ASCII-only tenant ids.

use regex::Regex;

use super::{ConfigurationError, StrategyPhase};

/// Name of the capture group holding the tenant id.
const TENANT_ID_GROUP: &str = "tenant_id";

/// Compiled path patterns for one registered strategy.
///
/// Immutable after construction; share it freely between concurrent requests.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    path_prefix: String,
    callback_suffix: String,
    tenant_instance: Regex,
    request: Regex,
    callback: Regex,
}

impl PathMatcher {
    /// Compile the tenant-instance, request and callback patterns.
    ///
    /// Fails if the prefix or tenant id pattern does not produce a valid
    /// pattern once embedded (for example an unbalanced group in the prefix).
    pub fn compile(
        path_prefix: &str,
        tenant_id_pattern: &str,
        callback_suffix: &str,
    ) -> Result<Self, ConfigurationError> {
        let tenant_instance =
            format!("^{path_prefix}/(?P<{TENANT_ID_GROUP}>{tenant_id_pattern})");
        let request = format!("{tenant_instance}/?$");
        let callback = format!("{tenant_instance}/{}/?$", regex::escape(callback_suffix));

        Ok(Self {
            path_prefix: path_prefix.to_string(),
            callback_suffix: callback_suffix.to_string(),
            tenant_instance: compile_pattern(&tenant_instance)?,
            request: compile_pattern(&request)?,
            callback: compile_pattern(&callback)?,
        })
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn callback_suffix(&self) -> &str {
        &self.callback_suffix
    }

    pub fn is_request_path(&self, path: &str) -> bool {
        self.request.is_match(path)
    }

    pub fn is_callback_path(&self, path: &str) -> bool {
        self.callback.is_match(path)
    }

    /// Classify a path as request phase, callback phase, or neither.
    ///
    /// With an empty callback suffix both patterns can match; the request
    /// phase wins.
    pub fn classify(&self, path: &str) -> Option<StrategyPhase> {
        if self.is_request_path(path) {
            Some(StrategyPhase::Request)
        } else if self.is_callback_path(path) {
            Some(StrategyPhase::Callback)
        } else {
            None
        }
    }

    /// Extract the tenant id from a path beginning with `prefix/<id>`.
    ///
    /// Trailing content after the id is ignored, so this also yields an id for
    /// paths that are neither request nor callback paths.
    pub fn extract_tenant_id<'a>(&self, path: &'a str) -> Option<&'a str> {
        self.tenant_instance
            .captures(path)
            .and_then(|caps| caps.name(TENANT_ID_GROUP))
            .map(|m| m.as_str())
    }

    /// The concrete request path for a tenant: `prefix/id`.
    pub fn request_path_for(&self, tenant_id: &str) -> String {
        format!("{}/{}", self.path_prefix, tenant_id)
    }

    /// The concrete callback path for a tenant: `prefix/id/suffix`.
    pub fn callback_path_for(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.path_prefix, tenant_id, self.callback_suffix
        )
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigurationError> {
    Regex::new(pattern).map_err(|source| ConfigurationError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
