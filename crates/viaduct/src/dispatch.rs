//! Compiling pipelines into registered route handlers.
//!
//! `compile` freezes a stage list and terminal stage into a handler
//! closure matching the host server's signature. Each invocation runs
//! one request through the pipeline under a tracing span and sends
//! exactly one response: the halt payload, the terminal outcome, or a
//! generic 500 when a stage or the terminal fails unexpectedly. Failure
//! detail is logged server-side and never reaches the client.

use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::Instrument;

use viaduct_core::{
    error_response, json_response, Context, Flow, RequestId, RequestParts, Response, RouteHandler,
    Stage, Terminal,
};

use crate::executor;

/// An opaque handle naming a registered route.
///
/// Returned by [`Pipeline::build`](crate::Pipeline::build) after the
/// handler has been registered with the host server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    method: Method,
    path: String,
}

impl Endpoint {
    pub(crate) fn new(method: Method, path: String) -> Self {
        Self { method, path }
    }

    /// Returns the registered verb.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the registered path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Freezes a stage list and terminal into a route handler.
///
/// The handler owns its own snapshot of the stages; later builder
/// activity cannot affect a compiled route.
pub(crate) fn compile(stages: Vec<Arc<dyn Stage>>, terminal: Arc<dyn Terminal>) -> RouteHandler {
    let stages: Arc<[Arc<dyn Stage>]> = stages.into();

    Arc::new(move |req: RequestParts| {
        let stages = Arc::clone(&stages);
        let terminal = Arc::clone(&terminal);
        let span = tracing::info_span!(
            "request",
            id = %RequestId::new(),
            method = %req.method(),
            path = %req.path(),
        );

        Box::pin(async move { respond(&stages, terminal.as_ref(), &req).await }.instrument(span))
    })
}

/// Runs one request through the pipeline and produces the response.
async fn respond(
    stages: &[Arc<dyn Stage>],
    terminal: &dyn Terminal,
    req: &RequestParts,
) -> Response {
    match executor::run_stages(stages, &Context::new(), req).await {
        Ok(Flow::Halt(halt)) => {
            tracing::debug!(status = %halt.status, "pipeline halted");
            json_response(halt.status, &halt.body)
        }
        Ok(Flow::Continue(ctx)) => match terminal.finish(&ctx, req).await {
            Ok(outcome) => json_response(outcome.status, &outcome.data),
            Err(error) => {
                tracing::error!(terminal = terminal.name(), error = ?error, "terminal stage failed");
                internal_error()
            }
        },
        Err(error) => {
            tracing::error!(error = ?error, "pipeline stage failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "internal server error",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Uri};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use viaduct_core::{stage_fn, terminal_fn, Outcome};

    fn make_request() -> RequestParts {
        RequestParts::new(
            Method::GET,
            Uri::from_static("/test"),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    async fn body_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn echo_terminal() -> Arc<dyn Terminal> {
        Arc::new(terminal_fn("echo", |ctx, _req| {
            let data = ctx.clone().into_value();
            Box::pin(async move { Ok(Outcome::ok(data)) })
        }))
    }

    #[tokio::test]
    async fn terminal_outcome_becomes_the_response() {
        let stage: Arc<dyn Stage> = Arc::new(stage_fn("tag", |_ctx, _req| {
            Box::pin(async {
                Ok(Flow::fragment(Context::new().with("tagged", json!(true))))
            })
        }));

        let handler = compile(vec![stage], echo_terminal());
        let response = handler(make_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, json!({"tagged": true}));
    }

    #[tokio::test]
    async fn halt_is_sent_verbatim() {
        let stage: Arc<dyn Stage> = Arc::new(stage_fn("deny", |_ctx, _req| {
            Box::pin(async {
                Ok(Flow::halt(
                    StatusCode::FORBIDDEN,
                    json!({"error": {"code": "FORBIDDEN", "message": "no"}}),
                ))
            })
        }));

        let handler = compile(vec![stage], echo_terminal());
        let response = handler(make_request()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_of(response).await,
            json!({"error": {"code": "FORBIDDEN", "message": "no"}})
        );
    }

    #[tokio::test]
    async fn stage_error_becomes_generic_500() {
        let stage: Arc<dyn Stage> = Arc::new(stage_fn("broken", |_ctx, _req| {
            Box::pin(async { Err(anyhow::anyhow!("secret detail")) })
        }));

        let handler = compile(vec![stage], echo_terminal());
        let response = handler(make_request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["error"]["code"], json!("INTERNAL_ERROR"));
        assert!(!body.to_string().contains("secret detail"));
    }

    #[tokio::test]
    async fn terminal_error_becomes_generic_500() {
        let terminal: Arc<dyn Terminal> = Arc::new(terminal_fn("broken", |_ctx, _req| {
            Box::pin(async { Err(anyhow::anyhow!("db down")) })
        }));

        let handler = compile(Vec::new(), terminal);
        let response = handler(make_request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert!(!body.to_string().contains("db down"));
    }

    #[tokio::test]
    async fn each_invocation_starts_from_an_empty_context() {
        let terminal: Arc<dyn Terminal> = Arc::new(terminal_fn("count", |ctx, _req| {
            let fields = ctx.len();
            Box::pin(async move { Ok(Outcome::ok(json!({"fields": fields}))) })
        }));

        let handler = compile(Vec::new(), terminal);

        for _ in 0..2 {
            let response = handler(make_request()).await;
            assert_eq!(body_of(response).await, json!({"fields": 0}));
        }
    }
}
