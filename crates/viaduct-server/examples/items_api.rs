//! A small items API showing pipeline composition.
//!
//! Run with `cargo run --example items_api`, then:
//!
//! ```text
//! curl 'http://127.0.0.1:8080/items?page=2' -H 'authorization: Bearer demo'
//! curl -X POST 'http://127.0.0.1:8080/items' -H 'authorization: Bearer demo' \
//!      -d '{"name":"widget"}'
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use viaduct::prelude::*;
use viaduct_server::{HttpServer, ServerConfig};

#[derive(Deserialize, Serialize)]
struct PageQuery {
    #[serde(default)]
    page: u32,
}

#[derive(Deserialize, Serialize)]
struct CreateItem {
    name: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn require_auth() -> impl Stage {
    stage_fn("require-auth", |_ctx, req| {
        let authorized = req.header("authorization").is_some();
        Box::pin(async move {
            if authorized {
                Ok(Flow::fragment(Context::new().with("authed", json!(true))))
            } else {
                Ok(Flow::halt(
                    http::StatusCode::UNAUTHORIZED,
                    json!({"error": {"code": "UNAUTHENTICATED", "message": "missing credentials"}}),
                ))
            }
        })
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let server = HttpServer::new(ServerConfig::builder().http_addr("127.0.0.1:8080").build());

    // Shared prefix: every route below requires auth.
    let authed = Pipeline::new(server.clone()).middleware(require_auth());

    authed
        .clone()
        .path("/items")
        .query_schema(QuerySchema::<PageQuery>::new())
        .get(terminal_fn("list-items", |ctx, _req| {
            let page = ctx.get("query").cloned().unwrap_or(json!({}));
            Box::pin(async move { Ok(Outcome::ok(json!({"page": page, "items": []}))) })
        }))
        .build()?;

    authed
        .path("/items")
        .body_schema(JsonSchema::<CreateItem>::new())
        .post(terminal_fn("create-item", |ctx, _req| {
            let item = ctx.get("body").cloned().unwrap_or(json!(null));
            Box::pin(async move {
                Ok(Outcome::new(
                    http::StatusCode::CREATED,
                    json!({"created": item}),
                ))
            })
        }))
        .build()?;

    server.run().await?;
    Ok(())
}
