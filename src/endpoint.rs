//! Named HTTP endpoint descriptors.
//!
//! An [`Endpoint`] is a fixed HTTP operation: a method, a URL template, and
//! a flag saying whether the template contains `{param}` placeholders that
//! must be filled from the request body. The [`EndpointTable`] maps logical
//! operation names to endpoints; it is plain data supplied by the host, not
//! part of the query machinery.
//!
//! # Example
//!
//! ```rust
//! use repoll::endpoint::{Endpoint, EndpointTable};
//! use reqwest::Method;
//!
//! let table = EndpointTable::new()
//!     .define("list-jobs", Endpoint::new(Method::POST, "/jobs/search/"))
//!     .define("job-detail", Endpoint::interpolated(Method::GET, "/jobs/{id}/"));
//!
//! assert!(table.get("list-jobs").is_some());
//! assert!(table.get("job-detail").map(|e| e.interpolate) == Some(true));
//! ```

use std::collections::HashMap;

use reqwest::Method;

/// A fixed HTTP operation: method, URL template, and interpolation flag.
///
/// Immutable after construction. When `interpolate` is set, the template's
/// `{name}` placeholders are filled from the request body at fetch time and
/// the body itself is sent empty (the parameters are path data, not payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// HTTP method used for this operation.
    pub method: Method,
    /// Path template, possibly containing `{name}` placeholders.
    pub url_template: String,
    /// Whether the template requires placeholder substitution.
    pub interpolate: bool,
}

impl Endpoint {
    /// Create an endpoint with a literal path (no placeholders).
    #[must_use]
    pub fn new(method: Method, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            interpolate: false,
        }
    }

    /// Create an endpoint whose path placeholders are filled from the body.
    #[must_use]
    pub fn interpolated(method: Method, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            interpolate: true,
        }
    }
}

/// A static mapping from logical operation name to [`Endpoint`].
#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    endpoints: HashMap<String, Endpoint>,
}

impl EndpointTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint, builder-style.
    #[must_use]
    pub fn define(mut self, name: impl Into<String>, endpoint: Endpoint) -> Self {
        self.endpoints.insert(name.into(), endpoint);
        self
    }

    /// Add an endpoint in place. Replaces any previous entry for `name`.
    pub fn insert(&mut self, name: impl Into<String>, endpoint: Endpoint) {
        self.endpoints.insert(name.into(), endpoint);
    }

    /// Look up an endpoint by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Number of defined endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no endpoints are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
