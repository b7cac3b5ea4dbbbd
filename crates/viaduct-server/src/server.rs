//! The hyper-backed HTTP server.
//!
//! [`HttpServer`] owns the route table and the serve loop. It
//! implements [`HostServer`], so pipelines register into it directly;
//! at serve time each connection runs on its own task, request bodies
//! are collected up front with a timeout, and the matched route handler
//! produces the response.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use viaduct_core::{error_response, HostServer, RequestParts, Response, RouteHandler};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::routes::{RouteLookup, RouteTable};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Viaduct host HTTP server.
///
/// A cheaply cloneable handle: clones share the same route table and
/// configuration. Routes are registered at configuration time (via
/// [`HostServer::register`], usually through `viaduct::Pipeline`) and
/// the table is never mutated per-request.
///
/// # Example
///
/// ```rust
/// use viaduct_server::{HttpServer, ServerConfig};
///
/// let server = HttpServer::new(ServerConfig::builder().http_addr("127.0.0.1:8080").build());
/// assert_eq!(server.route_count(), 0);
/// ```
#[derive(Clone)]
pub struct HttpServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    config: ServerConfig,
    routes: Mutex<RouteTable>,
}

impl HttpServer {
    /// Creates a server with the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                routes: Mutex::new(RouteTable::new()),
            }),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.lock().len()
    }

    /// Runs the server until the process receives an interrupt.
    pub async fn run(&self) -> Result<(), ServerError> {
        self.serve(ShutdownSignal::with_ctrl_c()).await
    }

    /// Runs the server until the given shutdown signal fires.
    ///
    /// Binds the configured address, accepts connections until
    /// shutdown, then waits (up to the shutdown timeout) for in-flight
    /// connections to drain.
    pub async fn serve(&self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self.config().socket_addr().map_err(|e| {
            ServerError::Bind(format!(
                "invalid address '{}': {}",
                self.config().http_addr(),
                e
            ))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind to {addr}: {e}")))?;

        tracing::info!("server listening on {}", addr);

        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = self.clone();
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::error!("connection error from {}: {}", remote_addr, e);
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!("failed to accept connection: {}", e);
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = self.config().shutdown_timeout();
        tracing::info!(
            "waiting up to {:?} for {} connections to close",
            shutdown_timeout,
            tracker.active_connections()
        );

        tokio::select! {
            () = tracker.wait_idle() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    "shutdown timeout reached, {} connections still active",
                    tracker.active_connections()
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    /// Handles a single connection.
    async fn handle_connection(
        &self,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = self.clone();

        let service = service_fn(move |req: Request<Incoming>| {
            let server = server.clone();
            async move { server.dispatch(req).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        tokio::select! {
            result = conn => result,
            () = shutdown.recv() => {
                tracing::debug!("connection from {} closed due to shutdown", remote_addr);
                Ok(())
            }
        }
    }

    /// Handles a single HTTP request.
    async fn dispatch(&self, req: Request<Incoming>) -> Result<Response, Infallible> {
        let (parts, body) = req.into_parts();

        tracing::debug!("{} {}", parts.method, parts.uri.path());

        let collected =
            tokio::time::timeout(self.config().request_timeout(), body.collect()).await;

        let bytes = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                tracing::error!("failed to collect request body: {}", e);
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    "failed to read request body",
                ));
            }
            Err(_) => {
                tracing::warn!("request body collection timed out");
                return Ok(error_response(
                    StatusCode::REQUEST_TIMEOUT,
                    "REQUEST_TIMEOUT",
                    "request body collection timed out",
                ));
            }
        };

        let lookup = self
            .inner
            .routes
            .lock()
            .lookup(&parts.method, parts.uri.path());

        match lookup {
            RouteLookup::Found(handler) => {
                let request = RequestParts::new(parts.method, parts.uri, parts.headers, bytes);
                Ok(handler(request).await)
            }
            RouteLookup::MethodNotAllowed => Ok(error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                "method not allowed for this path",
            )),
            RouteLookup::NotFound => Ok(error_response(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "no route matches this path",
            )),
        }
    }
}

impl HostServer for HttpServer {
    fn register(&self, method: Method, path: &str, handler: RouteHandler) {
        tracing::info!(%method, path, "route registered");
        self.inner.routes.lock().insert(method, path, handler);
    }
}
