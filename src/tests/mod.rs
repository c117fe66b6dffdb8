//! Consolidated test modules.
//!
//! End-to-end tests that drive the assembled router with real HTTP requests.
