//! The pipeline step traits.
//!
//! A [`Stage`] is one step of a request pipeline: it observes the
//! context accumulated so far plus the incoming request, and resolves to
//! a [`Flow`] (continue with a fragment, or halt with a response). A
//! [`Terminal`] is the mandatory last step: it consumes the fully merged
//! context and always produces an [`Outcome`].
//!
//! Both traits are object-safe and async via boxed futures. An `Err`
//! from either is the unexpected-failure channel: the dispatcher
//! contains it, logs the detail server-side, and answers a generic 500.
//!
//! # Example
//!
//! ```
//! use viaduct_core::{stage_fn, Context, Flow, RequestParts, Stage};
//! use serde_json::json;
//!
//! let auth = stage_fn("auth", |_ctx, req: &RequestParts| {
//!     let authorized = req.header("authorization").is_some();
//!     Box::pin(async move {
//!         if authorized {
//!             Ok(Flow::fragment(Context::new().with("authed", json!(true))))
//!         } else {
//!             Ok(Flow::halt(
//!                 http::StatusCode::UNAUTHORIZED,
//!                 json!({"error": {"code": "UNAUTHENTICATED", "message": "missing credentials"}}),
//!             ))
//!         }
//!     })
//! });
//! assert_eq!(auth.name(), "auth");
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::Context;
use crate::flow::{Flow, Outcome};
use crate::request::RequestParts;

/// A boxed future, the return type of stage invocations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The future a [`Stage`] resolves to.
pub type StageFuture<'a> = BoxFuture<'a, anyhow::Result<Flow>>;

/// The future a [`Terminal`] resolves to.
pub type TerminalFuture<'a> = BoxFuture<'a, anyhow::Result<Outcome>>;

/// One step of a request pipeline.
///
/// Stages run strictly in append order, one at a time. A stage must not
/// mutate the context it receives; it contributes data by returning a
/// fragment in [`Flow::Continue`]. Returning [`Flow::Halt`] stops the
/// pipeline with an explicit response; returning `Err` reports a defect
/// that the dispatcher converts into a generic 500.
pub trait Stage: Send + Sync + 'static {
    /// The stage name, used for logging and debugging.
    fn name(&self) -> &'static str {
        "stage"
    }

    /// Runs this stage against the accumulated context and the request.
    fn call<'a>(&'a self, ctx: &'a Context, req: &'a RequestParts) -> StageFuture<'a>;
}

/// The mandatory last step of a pipeline.
///
/// The terminal stage observes the fully merged context from all prior
/// stages, never a partial view, and unconditionally produces the HTTP
/// response.
pub trait Terminal: Send + Sync + 'static {
    /// The terminal stage name, used for logging and debugging.
    fn name(&self) -> &'static str {
        "terminal"
    }

    /// Produces the response from the final merged context.
    fn finish<'a>(&'a self, ctx: &'a Context, req: &'a RequestParts) -> TerminalFuture<'a>;
}

/// A [`Stage`] built from a closure. See [`stage_fn`].
pub struct FnStage<F> {
    name: &'static str,
    func: F,
}

/// Wraps a closure as a named [`Stage`].
///
/// The closure receives the accumulated context and the request and
/// returns a boxed future, mirroring a hand-written `Stage` impl.
pub fn stage_fn<F>(name: &'static str, func: F) -> FnStage<F>
where
    F: for<'a> Fn(&'a Context, &'a RequestParts) -> StageFuture<'a> + Send + Sync + 'static,
{
    FnStage { name, func }
}

impl<F> Stage for FnStage<F>
where
    F: for<'a> Fn(&'a Context, &'a RequestParts) -> StageFuture<'a> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn call<'a>(&'a self, ctx: &'a Context, req: &'a RequestParts) -> StageFuture<'a> {
        (self.func)(ctx, req)
    }
}

/// A [`Terminal`] built from a closure. See [`terminal_fn`].
pub struct FnTerminal<F> {
    name: &'static str,
    func: F,
}

/// Wraps a closure as a named [`Terminal`].
pub fn terminal_fn<F>(name: &'static str, func: F) -> FnTerminal<F>
where
    F: for<'a> Fn(&'a Context, &'a RequestParts) -> TerminalFuture<'a> + Send + Sync + 'static,
{
    FnTerminal { name, func }
}

impl<F> Terminal for FnTerminal<F>
where
    F: for<'a> Fn(&'a Context, &'a RequestParts) -> TerminalFuture<'a> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn finish<'a>(&'a self, ctx: &'a Context, req: &'a RequestParts) -> TerminalFuture<'a> {
        (self.func)(ctx, req)
    }
}
