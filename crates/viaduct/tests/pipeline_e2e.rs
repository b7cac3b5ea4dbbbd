//! End-to-end pipeline tests.
//!
//! These tests register pipelines against an in-memory host server and
//! drive whole requests through the compiled handlers: stage ordering
//! and merging, halts, links, schema validation, and error containment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use viaduct::prelude::*;

/// An in-memory host server: stores handlers, lets tests invoke them.
#[derive(Clone, Default)]
struct TestServer {
    routes: Arc<Mutex<Vec<(Method, String, RouteHandler)>>>,
}

impl HostServer for TestServer {
    fn register(&self, method: Method, path: &str, handler: RouteHandler) {
        self.routes
            .lock()
            .unwrap()
            .push((method, path.to_string(), handler));
    }
}

impl TestServer {
    fn handler(&self, method: &Method, path: &str) -> RouteHandler {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(m, p, _)| m == method && p == path)
            .map(|(_, _, h)| Arc::clone(h))
            .expect("route not registered")
    }

    async fn request(
        &self,
        method: Method,
        uri: &'static str,
        body: &'static str,
    ) -> (StatusCode, Value) {
        let parsed = Uri::from_static(uri);
        let handler = self.handler(&method, parsed.path());
        let req = RequestParts::new(
            method,
            parsed,
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        );

        let response = handler(req).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }
}

/// A stage that contributes one field and counts its invocations.
fn counting_stage(key: &'static str, value: i64, hits: Arc<AtomicUsize>) -> impl Stage {
    stage_fn(key, move |_ctx, _req| {
        let hits = Arc::clone(&hits);
        Box::pin(async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::fragment(Context::new().with(key, json!(value))))
        })
    })
}

/// A terminal that replies 200 with the merged context as the payload.
fn echo_terminal() -> impl Terminal {
    terminal_fn("echo", |ctx, _req| {
        let data = ctx.clone().into_value();
        Box::pin(async move { Ok(Outcome::ok(data)) })
    })
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct PageQuery {
    page: u32,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct CreateItem {
    name: String,
    #[serde(default)]
    qty: u32,
}

#[tokio::test]
async fn all_continue_merges_left_to_right_into_the_terminal() {
    let server = TestServer::default();
    let hits = Arc::new(AtomicUsize::new(0));

    Pipeline::new(server.clone())
        .path("/merged")
        .middleware(counting_stage("a", 1, Arc::clone(&hits)))
        .middleware(counting_stage("b", 2, Arc::clone(&hits)))
        .get(echo_terminal())
        .build()
        .unwrap();

    let (status, body) = server.request(Method::GET, "/merged", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"a": 1, "b": 2}));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn halt_skips_later_stages_and_the_terminal() {
    let server = TestServer::default();
    let later_hits = Arc::new(AtomicUsize::new(0));
    let terminal_hits = Arc::new(AtomicUsize::new(0));

    let halting = stage_fn("deny", |_ctx, _req| {
        Box::pin(async {
            Ok(Flow::halt(
                StatusCode::FORBIDDEN,
                json!({"error": {"code": "FORBIDDEN", "message": "denied"}}),
            ))
        })
    });

    let terminal_hits_clone = Arc::clone(&terminal_hits);
    let terminal = terminal_fn("never", move |_ctx, _req| {
        let hits = Arc::clone(&terminal_hits_clone);
        Box::pin(async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::ok(json!(null)))
        })
    });

    Pipeline::new(server.clone())
        .path("/guarded")
        .middleware(halting)
        .middleware(counting_stage("later", 1, Arc::clone(&later_hits)))
        .get(terminal)
        .build()
        .unwrap();

    let (status, body) = server.request(Method::GET, "/guarded", "").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": {"code": "FORBIDDEN", "message": "denied"}}));
    assert_eq!(later_hits.load(Ordering::SeqCst), 0);
    assert_eq!(terminal_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fragment_collision_is_last_write_wins() {
    let server = TestServer::default();

    let first = stage_fn("first", |_ctx, _req| {
        Box::pin(async { Ok(Flow::fragment(Context::new().with("who", json!("first")))) })
    });
    let second = stage_fn("second", |_ctx, _req| {
        Box::pin(async { Ok(Flow::fragment(Context::new().with("who", json!("second")))) })
    });

    Pipeline::new(server.clone())
        .path("/collide")
        .middleware(first)
        .middleware(second)
        .get(echo_terminal())
        .build()
        .unwrap();

    let (_, body) = server.request(Method::GET, "/collide", "").await;
    assert_eq!(body, json!({"who": "second"}));
}

#[tokio::test]
async fn chained_link_is_equivalent_to_inlined_stages() {
    let server = TestServer::default();
    let hits = Arc::new(AtomicUsize::new(0));

    let link = Pipeline::new(server.clone())
        .middleware(counting_stage("a", 1, Arc::clone(&hits)))
        .middleware(counting_stage("b", 2, Arc::clone(&hits)))
        .build_link();

    Pipeline::new(server.clone())
        .path("/chained")
        .chain(link)
        .middleware(counting_stage("c", 3, Arc::clone(&hits)))
        .get(echo_terminal())
        .build()
        .unwrap();

    Pipeline::new(server.clone())
        .path("/inlined")
        .middleware(counting_stage("a", 1, Arc::clone(&hits)))
        .middleware(counting_stage("b", 2, Arc::clone(&hits)))
        .middleware(counting_stage("c", 3, Arc::clone(&hits)))
        .get(echo_terminal())
        .build()
        .unwrap();

    let (chained_status, chained_body) = server.request(Method::GET, "/chained", "").await;
    let (inlined_status, inlined_body) = server.request(Method::GET, "/inlined", "").await;

    assert_eq!(chained_status, inlined_status);
    assert_eq!(chained_body, inlined_body);
    assert_eq!(chained_body, json!({"a": 1, "b": 2, "c": 3}));
}

#[tokio::test]
async fn link_halt_short_circuits_the_outer_pipeline() {
    let server = TestServer::default();
    let hits = Arc::new(AtomicUsize::new(0));

    let deny = stage_fn("deny", |_ctx, _req| {
        Box::pin(async {
            Ok(Flow::halt(
                StatusCode::UNAUTHORIZED,
                json!({"error": {"code": "UNAUTHENTICATED", "message": "who are you"}}),
            ))
        })
    });

    let link = Pipeline::new(server.clone()).middleware(deny).build_link();

    Pipeline::new(server.clone())
        .path("/locked")
        .chain(link)
        .middleware(counting_stage("after", 1, Arc::clone(&hits)))
        .get(echo_terminal())
        .build()
        .unwrap();

    let (status, _) = server.request(Method::GET, "/locked", "").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn shared_template_drives_multiple_routes() {
    let server = TestServer::default();

    let authed = stage_fn("auth", |_ctx, req| {
        let authorized = req.header("authorization").is_some();
        Box::pin(async move {
            if authorized {
                Ok(Flow::fragment(Context::new().with("authed", json!(true))))
            } else {
                Ok(Flow::halt(
                    StatusCode::UNAUTHORIZED,
                    json!({"error": {"code": "UNAUTHENTICATED", "message": "missing credentials"}}),
                ))
            }
        })
    });

    let template = Pipeline::new(server.clone()).middleware(authed);

    template
        .clone()
        .path("/a")
        .get(echo_terminal())
        .build()
        .unwrap();
    template.path("/b").get(echo_terminal()).build().unwrap();

    let (status_a, _) = server.request(Method::GET, "/a", "").await;
    let (status_b, _) = server.request(Method::GET, "/b", "").await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn query_schema_feeds_the_terminal_with_coerced_values() {
    let server = TestServer::default();

    Pipeline::new(server.clone())
        .path("/items")
        .query_schema(QuerySchema::<PageQuery>::new())
        .get(echo_terminal())
        .build()
        .unwrap();

    let (status, body) = server.request(Method::GET, "/items?page=2", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"query": {"page": 2}}));
}

#[tokio::test]
async fn query_schema_rejects_bad_input_naming_the_field() {
    let server = TestServer::default();

    Pipeline::new(server.clone())
        .path("/items")
        .query_schema(QuerySchema::<PageQuery>::new())
        .get(echo_terminal())
        .build()
        .unwrap();

    let (status, body) = server.request(Method::GET, "/items?page=abc", "").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let issues = body["error"]["issues"].as_array().unwrap();
    assert!(!issues.is_empty());
    assert!(issues
        .iter()
        .any(|i| i["path"].as_str().unwrap_or("").contains("page")));
}

#[tokio::test]
async fn body_schema_accepts_and_transforms() {
    let server = TestServer::default();

    Pipeline::new(server.clone())
        .path("/items")
        .body_schema(JsonSchema::<CreateItem>::new())
        .post(echo_terminal())
        .build()
        .unwrap();

    let (status, body) = server
        .request(Method::POST, "/items", r#"{"name":"widget"}"#)
        .await;

    assert_eq!(status, StatusCode::OK);
    // the schema's transform applied the default for qty
    assert_eq!(body, json!({"body": {"name": "widget", "qty": 0}}));
}

#[tokio::test]
async fn body_schema_rejects_with_issues() {
    let server = TestServer::default();

    Pipeline::new(server.clone())
        .path("/items")
        .body_schema(JsonSchema::<CreateItem>::new())
        .post(echo_terminal())
        .build()
        .unwrap();

    let (status, body) = server
        .request(Method::POST, "/items", r#"{"name":42}"#)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let issues = body["error"]["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|i| i["path"].as_str().unwrap_or("").contains("name")));
}

#[tokio::test]
async fn stage_failure_is_contained_as_a_generic_500() {
    let server = TestServer::default();

    let broken = stage_fn("broken", |_ctx, _req| {
        Box::pin(async { Err(anyhow::anyhow!("credentials table missing")) })
    });

    Pipeline::new(server.clone())
        .path("/broken")
        .middleware(broken)
        .get(echo_terminal())
        .build()
        .unwrap();

    let (status, body) = server.request(Method::GET, "/broken", "").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], json!("INTERNAL_ERROR"));
    assert!(!body.to_string().contains("credentials table missing"));
}

#[tokio::test]
async fn every_request_gets_a_fresh_context() {
    let server = TestServer::default();

    // a stage whose fragment depends on what it has already seen would
    // leak state across requests if contexts were shared
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = Arc::clone(&counter);
    let stamping = stage_fn("stamp", move |ctx, _req| {
        let seen_before = ctx.contains("stamp");
        let counter = Arc::clone(&counter_clone);
        Box::pin(async move {
            if seen_before {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Flow::fragment(Context::new().with("stamp", json!(1))))
        })
    });

    Pipeline::new(server.clone())
        .path("/fresh")
        .middleware(stamping)
        .get(echo_terminal())
        .build()
        .unwrap();

    for _ in 0..3 {
        let (status, _) = server.request(Method::GET, "/fresh", "").await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 0);
}
