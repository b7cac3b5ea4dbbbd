//! The host-server interface and response helpers.
//!
//! The pipeline core does not own sockets or routing tables; it hands a
//! compiled handler to whatever implements [`HostServer`]. The
//! `viaduct-server` crate ships a hyper-backed implementation, and tests
//! typically use an in-memory one.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use serde_json::Value;

use crate::request::RequestParts;
use crate::stage::BoxFuture;

/// The HTTP response type produced by compiled pipelines.
pub type Response = http::Response<Full<Bytes>>;

/// A compiled, registered route handler.
///
/// Invoked once per matching incoming request; every invocation creates
/// a fresh context inside, so the handler is freely shareable.
pub type RouteHandler = Arc<dyn Fn(RequestParts) -> BoxFuture<'static, Response> + Send + Sync>;

/// The registration interface a host server must expose.
///
/// `register` is called once per built pipeline, at configuration time.
/// Implementations own the route table and invoke the handler once per
/// matching request thereafter.
pub trait HostServer: Send + Sync + 'static {
    /// Registers a handler for the given verb and path.
    fn register(&self, method: Method, path: &str, handler: RouteHandler);
}

/// Builds a JSON response with the given status and body.
///
/// The body is sent verbatim; the only header set is the content type.
#[must_use]
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::from(body.to_string()))))
}

/// Builds a JSON error envelope response: `{"error": {"code", "message"}}`.
#[must_use]
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });
    json_response(status, &body)
}
