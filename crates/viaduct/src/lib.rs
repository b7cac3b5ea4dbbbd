//! # Viaduct
//!
//! A fluent builder for HTTP request pipelines: chained validation and
//! authorization stages terminated by a single business-logic stage,
//! registered against a host server as a route handler.
//!
//! - **Immutable builder**: every configuration call returns a new
//!   [`Pipeline`] value, so partially configured pipelines are reusable
//!   templates.
//! - **Short-circuiting executor**: stages run strictly in order; any
//!   stage can halt with an explicit response, and at most one response
//!   is sent per request.
//! - **Merged context**: continuing stages contribute fragments that
//!   are shallow-merged (last-write-wins) into a per-request context
//!   the terminal stage consumes in full.
//! - **Schema stages**: [`body_schema`](Pipeline::body_schema) and
//!   [`query_schema`](Pipeline::query_schema) turn a declarative
//!   [`Schema`] into a validation stage that halts 400 with structured
//!   issues.
//! - **Links**: [`build_link`](Pipeline::build_link) compiles a stage
//!   list into a reusable [`Link`] that embeds in other pipelines via
//!   [`chain`](Pipeline::chain), behaving exactly as if its stages were
//!   inlined.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use viaduct::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct PageQuery { page: u32 }
//!
//! let endpoint = Pipeline::new(server)
//!     .path("/items")
//!     .query_schema(QuerySchema::<PageQuery>::new())
//!     .get(terminal_fn("list-items", |ctx, _req| {
//!         let page = ctx.get("query").cloned();
//!         Box::pin(async move { Ok(Outcome::ok(serde_json::json!({"page": page}))) })
//!     }))
//!     .build()?;
//! ```

#![doc(html_root_url = "https://docs.rs/viaduct/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod dispatch;
pub mod executor;
pub mod schema;

pub use builder::Pipeline;
pub use dispatch::Endpoint;
pub use executor::Link;
pub use schema::{Issue, IssueList, JsonSchema, QuerySchema, Schema, SchemaError, SchemaStage, Target};

// Re-export the core types so most users need a single dependency.
pub use viaduct_core::{
    error_response, json_response, stage_fn, terminal_fn, BoxFuture, ConfigError, Context, Flow,
    FnStage, FnTerminal, Halt, HostServer, Outcome, RequestId, RequestParts, Response,
    RouteHandler, Stage, StageFuture, Terminal, TerminalFuture,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::Pipeline;
    pub use crate::dispatch::Endpoint;
    pub use crate::executor::Link;
    pub use crate::schema::{
        Issue, IssueList, JsonSchema, QuerySchema, Schema, SchemaError, SchemaStage, Target,
    };
    pub use viaduct_core::{
        stage_fn, terminal_fn, ConfigError, Context, Flow, Halt, HostServer, Outcome, RequestId,
        RequestParts, Response, RouteHandler, Stage, Terminal,
    };
}
