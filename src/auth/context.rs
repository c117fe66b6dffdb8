//! Per-request state handed to provider hooks.

use http::{HeaderMap, Method, request::Parts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Strategy options: option name to arbitrary value.
pub type StrategyOptions = Map<String, Value>;

/// The two path roles a strategy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPhase {
    /// The path that initiates authentication with the identity provider.
    Request,
    /// The path that receives the identity provider's response.
    Callback,
}

/// A single request as seen by the provider hooks.
///
/// Owned by the host for the duration of one request. Hooks borrow it and
/// cannot hold on to it past the call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    options: StrategyOptions,
}

impl RequestContext {
    /// Create a context for a bare `GET` of `path` with no headers or options.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            options: StrategyOptions::new(),
        }
    }

    /// Create a context from the head of an HTTP request.
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
            options: StrategyOptions::new(),
        }
    }

    pub fn with_options(mut self, options: StrategyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string, ignoring values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn options(&self) -> &StrategyOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut StrategyOptions {
        &mut self.options
    }

    pub fn into_options(self) -> StrategyOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use http::Request;

    use super::*;

    #[test]
    fn test_from_parts() {
        let (parts, ()) = Request::builder()
            .method(Method::POST)
            .uri("https://sp.example.com/auth/saml/42/callback?RelayState=abc")
            .header("x-forwarded-host", "acme.example.com")
            .body(())
            .unwrap()
            .into_parts();

        let context = RequestContext::from_parts(&parts);
        assert_eq!(context.method(), &Method::POST);
        assert_eq!(context.path(), "/auth/saml/42/callback");
        assert_eq!(context.query(), Some("RelayState=abc"));
        assert_eq!(context.header("x-forwarded-host"), Some("acme.example.com"));
        assert!(context.options().is_empty());
    }

    #[test]
    fn test_options_are_mutable() {
        let mut context = RequestContext::new("/auth/saml/42");
        context
            .options_mut()
            .insert("issuer".to_string(), Value::from("sp"));
        assert_eq!(context.into_options()["issuer"], "sp");
    }
}
