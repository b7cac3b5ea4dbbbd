//! The route table.
//!
//! Routes are exact verb+path pairs registered at configuration time.
//! Paths are normalized (leading slash ensured, trailing slash
//! stripped) so `/items` and `/items/` address the same route. Lookup
//! distinguishes an unknown path from a known path with the wrong verb
//! so the server can answer 404 vs 405.

use http::Method;
use viaduct_core::RouteHandler;

/// The result of resolving an incoming request against the table.
pub(crate) enum RouteLookup {
    /// A handler is registered for this verb and path.
    Found(RouteHandler),
    /// The path exists, but not for this verb.
    MethodNotAllowed,
    /// No route matches the path.
    NotFound,
}

struct Route {
    method: Method,
    path: String,
    handler: RouteHandler,
}

/// Registered routes, checked in registration order (first match wins).
#[derive(Default)]
pub(crate) struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, method: Method, path: &str, handler: RouteHandler) {
        self.routes.push(Route {
            method,
            path: normalize(path),
            handler,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> RouteLookup {
        let path = normalize(path);
        let mut path_matched = false;

        for route in &self.routes {
            if route.path == path {
                if route.method == *method {
                    return RouteLookup::Found(route.handler.clone());
                }
                path_matched = true;
            }
        }

        if path_matched {
            RouteLookup::MethodNotAllowed
        } else {
            RouteLookup::NotFound
        }
    }
}

/// Ensures a leading slash and strips trailing slashes (except root).
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
