// Regex route table with not-found and server-error fallbacks

use crate::handler::{
    BoxedHandler, ErrorHandler, Handler, PathParams, default_not_found, default_server_error,
    error_handler, handler,
};
use crate::response::{IntoResponse, Response};
use crate::{Error, Request};
use regex::Regex;
use std::fmt;
use std::future::Future;

/// A compiled pattern and its view.
#[derive(Clone)]
pub struct Route {
    pub pattern: String,
    pub regex: Regex,
    pub handler: BoxedHandler,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Ordered route table.
///
/// Routes are tried in registration order and the first pattern found
/// anywhere in the path wins. Anchor patterns with `^`/`$` for exact matches.
#[derive(Clone)]
pub struct Router {
    routes: Vec<Route>,
    not_found: BoxedHandler,
    server_error: ErrorHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            not_found: handler(default_not_found),
            server_error: error_handler(default_server_error),
        }
    }

    /// Replace the 404 view. It receives `{"error": "Path <path> Not Found"}`.
    pub fn with_not_found<F, Fut, R>(mut self, view: F) -> Self
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.not_found = handler(view);
        self
    }

    /// Replace the 500 view. It receives the failure that triggered it.
    pub fn with_server_error<F, Fut, R>(mut self, view: F) -> Self
    where
        F: Fn(Request, Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.server_error = error_handler(view);
        self
    }

    /// Register `view` under a regular expression.
    ///
    /// Registering the same pattern text again replaces the view but keeps
    /// the route's original position.
    pub fn add_route<F, Fut, R>(&mut self, pattern: &str, view: F) -> Result<(), Error>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.add_handler(pattern, handler(view))
    }

    /// Chaining form of [`add_route`](Self::add_route).
    pub fn route<F, Fut, R>(mut self, pattern: &str, view: F) -> Result<Self, Error>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.add_route(pattern, view)?;
        Ok(self)
    }

    /// Register a custom [`Handler`] implementation.
    pub fn add_service<H: Handler>(&mut self, pattern: &str, service: H) -> Result<(), Error> {
        self.add_handler(pattern, BoxedHandler::new(service))
    }

    /// Register an already erased handler.
    pub fn add_handler(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        if let Some(route) = self.routes.iter_mut().find(|r| r.pattern == pattern) {
            phial_log::debug!(target: "phial::router", "Replacing view for pattern {}", pattern);
            route.handler = handler;
            return Ok(());
        }

        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        phial_log::debug!(target: "phial::router", "Registered route {}", pattern);
        self.routes.push(Route {
            pattern: pattern.to_string(),
            regex,
            handler,
        });
        Ok(())
    }

    /// Resolve `path` to a view and its named parameters.
    ///
    /// Groups that did not take part in the match are left out. A miss
    /// yields the not-found view with an `error` parameter.
    pub fn dispatch(&self, path: &str) -> (&BoxedHandler, PathParams) {
        for route in &self.routes {
            if let Some(caps) = route.regex.captures(path) {
                let params = route
                    .regex
                    .capture_names()
                    .flatten()
                    .filter_map(|name| caps.name(name).map(|m| (name, m.as_str())))
                    .collect();
                phial_log::trace!(target: "phial::router", "{} matched {}", path, route.pattern);
                return (&route.handler, params);
            }
        }

        phial_log::debug!(target: "phial::router", "No route for {}", path);
        let mut params = PathParams::new();
        params.insert("error", format!("Path {} Not Found", path));
        (&self.not_found, params)
    }

    /// Run the server-error view for `error`.
    pub async fn handle_server_error(&self, req: Request, error: Error) -> Response {
        (self.server_error)(req, error).await
    }

    pub fn not_found_handler(&self) -> &BoxedHandler {
        &self.not_found
    }

    pub fn server_error_handler(&self) -> &ErrorHandler {
        &self.server_error
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Registered pattern texts in match order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}
