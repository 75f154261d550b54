// View handler types and the default fallbacks
//
// Views are async functions `(Request, PathParams) -> Result<impl IntoResponse, Error>`.
// Each one is wrapped in a monomorphized `FnHandler` and type-erased into a
// `BoxedHandler` only when it is stored in the route table.

use crate::response::{IntoResponse, Response};
use crate::{Error, Request};
use futures_util::future::{BoxFuture, FutureExt, MapOk, TryFutureExt};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Named capture groups from the matched route pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Like [`get`](Self::get), but a missing name is an error.
    pub fn require(&self, name: &str) -> Result<&str, Error> {
        self.get(name)
            .ok_or_else(|| Error::MissingParam(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A view that can be dispatched to.
///
/// The associated future keeps each implementation monomorphized; erasure
/// happens once, in [`BoxedHandler`].
pub trait Handler: Send + Sync + 'static {
    type Future: Future<Output = Result<Response, Error>> + Send + 'static;

    fn call(&self, req: Request, params: PathParams) -> Self::Future;
}

/// Adapts an async function returning any [`IntoResponse`] value.
pub struct FnHandler<F, R> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> FnHandler<F, R> {
    #[inline]
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, Fut, R> Handler for FnHandler<F, R>
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + 'static,
{
    type Future = MapOk<Fut, fn(R) -> Response>;

    #[inline]
    fn call(&self, req: Request, params: PathParams) -> Self::Future {
        (self.f)(req, params).map_ok(R::into_response as fn(R) -> Response)
    }
}

/// Type-erased handler stored in the route table. Cloning shares the view.
#[derive(Clone)]
pub struct BoxedHandler {
    inner: Arc<dyn ErasedHandler>,
}

impl BoxedHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    #[inline]
    pub fn call(
        &self,
        req: Request,
        params: PathParams,
    ) -> BoxFuture<'static, Result<Response, Error>> {
        self.inner.call_boxed(req, params)
    }

    /// Whether both handles point at the same registered view.
    pub fn ptr_eq(&self, other: &BoxedHandler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedHandler").finish_non_exhaustive()
    }
}

trait ErasedHandler: Send + Sync {
    fn call_boxed(
        &self,
        req: Request,
        params: PathParams,
    ) -> BoxFuture<'static, Result<Response, Error>>;
}

impl<H: Handler> ErasedHandler for H {
    fn call_boxed(
        &self,
        req: Request,
        params: PathParams,
    ) -> BoxFuture<'static, Result<Response, Error>> {
        Box::pin(Handler::call(self, req, params))
    }
}

/// Wrap an async view function.
///
/// ```ignore
/// async fn hello(_req: Request, params: PathParams) -> Result<String, Error> {
///     Ok(format!("Hello {}", params.require("name")?))
/// }
///
/// let h = handler(hello);
/// ```
pub fn handler<F, Fut, R>(f: F) -> BoxedHandler
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse + 'static,
{
    BoxedHandler::new(FnHandler::new(f))
}

/// Server-error fallback: turns a failure into the response that is sent.
pub type ErrorHandler = Arc<dyn Fn(Request, Error) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async function as an [`ErrorHandler`].
pub fn error_handler<F, Fut, R>(f: F) -> ErrorHandler
where
    F: Fn(Request, Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    Arc::new(move |req, err| f(req, err).map(R::into_response).boxed())
}

/// 404 with the router's diagnostic as the body.
pub async fn default_not_found(_req: Request, params: PathParams) -> Result<Response, Error> {
    Ok(Response::not_found(
        params.get("error").unwrap_or_default().to_string(),
    ))
}

/// 500 with the error's message as the body.
pub async fn default_server_error(_req: Request, error: Error) -> Response {
    Response::internal_server_error(error.to_string())
}
