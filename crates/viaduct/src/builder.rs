//! The fluent, immutable pipeline builder.
//!
//! A [`Pipeline`] accumulates stages, a path, a verb, and a terminal
//! stage. Every configuration method consumes the builder and returns a
//! new value; cloning a partially configured pipeline yields an
//! independent template, so shared prefixes (e.g. "require auth") are
//! built once and reused.

use std::sync::Arc;

use http::Method;

use viaduct_core::{ConfigError, HostServer, Stage, Terminal};

use crate::dispatch::{self, Endpoint};
use crate::executor::Link;
use crate::schema::{Schema, SchemaStage};

/// A route pipeline under construction.
///
/// Created with [`Pipeline::new`] around a host server handle,
/// configured through chained calls, and consumed by [`build`] (which
/// registers the route) or [`build_link`] (which compiles the stage
/// list into a reusable [`Link`]).
///
/// [`build`]: Pipeline::build
/// [`build_link`]: Pipeline::build_link
///
/// # Example
///
/// ```rust,ignore
/// let require_auth = Pipeline::new(server.clone()).middleware(AuthStage::new());
///
/// // Two routes derived from the same template.
/// require_auth
///     .clone()
///     .path("/items")
///     .get(list_items)
///     .build()?;
/// require_auth
///     .path("/items")
///     .body_schema(JsonSchema::<CreateItem>::new())
///     .post(create_item)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct Pipeline<S> {
    server: S,
    stages: Vec<Arc<dyn Stage>>,
    terminal: Option<Arc<dyn Terminal>>,
    method: Option<Method>,
    path: Option<String>,
}

impl<S> Pipeline<S> {
    /// Creates an empty pipeline bound to a host server handle.
    #[must_use]
    pub fn new(server: S) -> Self {
        Self {
            server,
            stages: Vec::new(),
            terminal: None,
            method: None,
            path: None,
        }
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn middleware(mut self, stage: impl Stage) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends a validation stage for the JSON request body.
    ///
    /// On success the parsed value is stored under the `body` context
    /// key; on invalid input the pipeline halts with a 400 and the
    /// issues list.
    #[must_use]
    pub fn body_schema(self, schema: impl Schema) -> Self {
        self.middleware(SchemaStage::body(schema))
    }

    /// Appends a validation stage for the URL query string.
    ///
    /// On success the parsed value is stored under the `query` context
    /// key; on invalid input the pipeline halts with a 400 and the
    /// issues list.
    #[must_use]
    pub fn query_schema(self, schema: impl Schema) -> Self {
        self.middleware(SchemaStage::query(schema))
    }

    /// Appends a compiled [`Link`] as a single opaque stage.
    ///
    /// The link behaves exactly as if its constituent stages had been
    /// appended directly.
    #[must_use]
    pub fn chain(mut self, link: Link) -> Self {
        self.stages.push(Arc::new(link));
        self
    }

    /// Binds (or overrides) the route path. The last call wins.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Binds the `GET` verb and the terminal stage.
    #[must_use]
    pub fn get(self, terminal: impl Terminal) -> Self {
        self.route(Method::GET, terminal)
    }

    /// Binds the `POST` verb and the terminal stage.
    #[must_use]
    pub fn post(self, terminal: impl Terminal) -> Self {
        self.route(Method::POST, terminal)
    }

    /// Binds the `PUT` verb and the terminal stage.
    #[must_use]
    pub fn put(self, terminal: impl Terminal) -> Self {
        self.route(Method::PUT, terminal)
    }

    /// Binds the `PATCH` verb and the terminal stage.
    #[must_use]
    pub fn patch(self, terminal: impl Terminal) -> Self {
        self.route(Method::PATCH, terminal)
    }

    /// Binds the `DELETE` verb and the terminal stage.
    #[must_use]
    pub fn delete(self, terminal: impl Terminal) -> Self {
        self.route(Method::DELETE, terminal)
    }

    /// Binds an arbitrary verb and the terminal stage. The last call
    /// wins, like [`path`](Pipeline::path).
    #[must_use]
    pub fn route(mut self, method: Method, terminal: impl Terminal) -> Self {
        self.method = Some(method);
        self.terminal = Some(Arc::new(terminal));
        self
    }

    /// Compiles the accumulated stage list into a reusable [`Link`].
    ///
    /// The link carries no terminal stage and registers nothing; embed
    /// it in other pipelines via [`chain`](Pipeline::chain). Any bound
    /// path, verb, or terminal on this builder is ignored.
    #[must_use]
    pub fn build_link(self) -> Link {
        Link::new(self.stages)
    }

    /// Returns the number of accumulated stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the bound route path, if any.
    #[must_use]
    pub fn route_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the bound verb, if any.
    #[must_use]
    pub fn verb(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Returns true once a verb call has bound the terminal stage.
    #[must_use]
    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

impl<S: HostServer> Pipeline<S> {
    /// Compiles the pipeline and registers it with the host server.
    ///
    /// Requires a bound path and a bound verb + terminal stage; fails
    /// with [`ConfigError`] otherwise, before any registration happens.
    /// On success the stage list is frozen into the handler closure and
    /// the handler is registered at `(verb, path)`; the returned
    /// [`Endpoint`] is an opaque handle naming the registered route.
    pub fn build(self) -> Result<Endpoint, ConfigError> {
        let Self {
            server,
            stages,
            terminal,
            method,
            path,
        } = self;

        let path = path.ok_or(ConfigError::MissingPath)?;
        let (method, terminal) = match (method, terminal) {
            (Some(method), Some(terminal)) => (method, terminal),
            _ => return Err(ConfigError::MissingRoute),
        };

        let handler = dispatch::compile(stages, terminal);
        server.register(method.clone(), &path, handler);

        Ok(Endpoint::new(method, path))
    }
}

impl<S> std::fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .field("method", &self.method)
            .field("path", &self.path)
            .field("terminal", &self.terminal.is_some())
            .finish_non_exhaustive()
    }
}
