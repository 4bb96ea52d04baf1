//! Route interpolation and single-attempt HTTP execution.
//!
//! The [`Executor`] performs exactly one request/response cycle for an
//! [`Endpoint`]: build the route (interpolating `{param}` placeholders from
//! the body when the endpoint asks for it), send the request, and classify
//! the outcome by status code. No retries, no caching, no timeouts; those
//! belong to the layers around this one.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::endpoint::Endpoint;

/// Error type for a single fetch attempt.
///
/// Stored in the query's observable snapshot, hence `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// A `{param}` placeholder has no matching key in the request body.
    #[error("missing path parameter `{0}` in request body")]
    MissingParam(String),

    /// The interpolated path could not be joined onto the base URL.
    #[error("invalid route `{route}`: {reason}")]
    Route { route: String, reason: String },

    /// Transport-level failure (connection refused, DNS, aborted, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a status other than 200 or 204.
    #[error("request failed with status {status} {reason}")]
    Status { status: u16, reason: String },

    /// A 200 response carried a body that is not valid JSON.
    #[error("invalid response payload: {0}")]
    Decode(String),
}

/// A successful fetch outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Status 200 with a decoded JSON body.
    Json(Value),
    /// Status 204; nothing to parse.
    Empty,
}

impl Payload {
    /// The decoded JSON value, if any.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Empty => None,
        }
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern"));

/// Substitute every `{identifier}` placeholder in `template` with the value
/// of the matching key in `body`, coerced to a string.
///
/// A missing key fails with [`FetchError::MissingParam`] before any network
/// activity; placeholders are never silently dropped or defaulted.
pub fn interpolate(template: &str, body: &Value) -> Result<String, FetchError> {
    let mut route = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let whole = caps.get(0).expect("capture 0 always present");
        let name = &caps[1];
        let value = body
            .get(name)
            .ok_or_else(|| FetchError::MissingParam(name.to_string()))?;

        route.push_str(&template[last..whole.start()]);
        route.push_str(&coerce(value));
        last = whole.end();
    }

    route.push_str(&template[last..]);
    Ok(route)
}

fn coerce(value: &Value) -> String {
    match value {
        // JSON strings go in verbatim, everything else as its JSON text.
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One-shot HTTP executor bound to a base URL.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Client,
    base: Url,
}

impl Executor {
    /// Create an executor with a fresh [`Client`].
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    /// Create an executor reusing an existing [`Client`].
    ///
    /// The base URL is normalized to end with `/` so endpoint paths append
    /// to it instead of replacing its last segment.
    #[must_use]
    pub fn with_client(client: Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    /// The base URL requests are issued against.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Perform one request/response cycle for `endpoint` with `body`.
    ///
    /// For interpolated endpoints the path parameters are consumed by the
    /// template and the outgoing body is reset to an empty object. GET
    /// requests carry no body at all. Status 200 parses the JSON payload,
    /// 204 yields [`Payload::Empty`], anything else is a [`FetchError`].
    pub async fn execute(&self, endpoint: &Endpoint, body: &Value) -> Result<Payload, FetchError> {
        let (path, body) = if endpoint.interpolate {
            let route = interpolate(&endpoint.url_template, body)?;
            (route, Value::Object(Map::new()))
        } else {
            (endpoint.url_template.clone(), body.clone())
        };

        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::Route {
                route: path.clone(),
                reason: e.to_string(),
            })?;

        let mut request = self
            .client
            .request(endpoint.method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if endpoint.method != Method::GET {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let value = response
                    .json::<Value>()
                    .await
                    .map_err(|e| FetchError::Decode(e.to_string()))?;
                Ok(Payload::Json(value))
            }
            StatusCode::NO_CONTENT => Ok(Payload::Empty),
            status => Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpolate_single_param() {
        let route = interpolate("/things/{id}/", &json!({"id": "42"})).unwrap();
        assert_eq!(route, "/things/42/");
    }

    #[test]
    fn test_interpolate_multiple_params() {
        let route = interpolate(
            "/users/{user}/jobs/{job}/",
            &json!({"user": "u1", "job": "j9"}),
        )
        .unwrap();
        assert_eq!(route, "/users/u1/jobs/j9/");
    }

    #[test]
    fn test_interpolate_coerces_scalars() {
        let route = interpolate("/things/{id}/{flag}/", &json!({"id": 42, "flag": true})).unwrap();
        assert_eq!(route, "/things/42/true/");
    }

    #[test]
    fn test_interpolate_missing_key_fails() {
        let err = interpolate("/things/{id}/", &json!({"other": 1})).unwrap_err();
        assert_eq!(err, FetchError::MissingParam("id".to_string()));
    }

    #[test]
    fn test_interpolate_non_object_body_fails() {
        let err = interpolate("/things/{id}/", &json!(null)).unwrap_err();
        assert_eq!(err, FetchError::MissingParam("id".to_string()));
    }

    #[test]
    fn test_interpolate_no_placeholders() {
        let route = interpolate("/jobs/search/", &json!({})).unwrap();
        assert_eq!(route, "/jobs/search/");
    }

    #[test]
    fn test_payload_json_accessor() {
        let payload = Payload::Json(json!({"ok": true}));
        assert_eq!(payload.json(), Some(&json!({"ok": true})));
        assert_eq!(Payload::Empty.json(), None);
    }

    #[test]
    fn test_base_url_normalized_with_trailing_slash() {
        let executor = Executor::new(Url::parse("http://example.com/api/v1").unwrap());
        assert_eq!(executor.base().path(), "/api/v1/");

        let executor = Executor::new(Url::parse("http://example.com/api/v1/").unwrap());
        assert_eq!(executor.base().path(), "/api/v1/");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::MissingParam("id".to_string());
        assert_eq!(err.to_string(), "missing path parameter `id` in request body");

        let err = FetchError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status 500 Internal Server Error"
        );
    }
}
