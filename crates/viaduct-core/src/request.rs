//! Immutable view of an incoming HTTP request.
//!
//! [`RequestParts`] is what pipeline stages see: method, URI, headers,
//! and the fully collected body. Validation stages read the named
//! attributes `body` (bytes parsed as JSON on demand) and `query` (the
//! raw query string).

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde_json::Value;

/// An incoming HTTP request, decomposed for pipeline consumption.
///
/// The body is collected up front by the host server, so stages never
/// deal with streaming I/O. The struct is cheap to clone (`Bytes` is
/// reference-counted).
///
/// # Example
///
/// ```
/// use viaduct_core::RequestParts;
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let req = RequestParts::new(
///     Method::GET,
///     Uri::from_static("/items?page=2"),
///     HeaderMap::new(),
///     Bytes::new(),
/// );
///
/// assert_eq!(req.path(), "/items");
/// assert_eq!(req.query_string(), Some("page=2"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestParts {
    /// Creates a request view from its parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a specific header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns the collected request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Checks if the request body is empty.
    #[must_use]
    pub fn is_body_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Parses the body as JSON.
    ///
    /// An empty body parses to `Value::Null`, so a missing body and an
    /// explicit JSON `null` are indistinguishable to validation stages.
    pub fn body_json(&self) -> Result<Value, serde_json::Error> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
    }
}

impl From<http::Request<Bytes>> for RequestParts {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body)
    }
}
