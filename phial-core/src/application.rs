// Application object and per-connection dispatch

use crate::config::AppConfig;
use crate::handler::{BoxedHandler, PathParams};
use crate::protocol::{Receive, Scope, Sink};
use crate::request::assemble;
use crate::{Error, HttpStatus, Request, Response, Router};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// The application a host calls once per connection.
///
/// Cloning is cheap; all clones share one read-only route table.
///
/// ```ignore
/// let router = Router::new().route("^/$", |_req, _params| async {
///     Ok::<_, Error>(Response::text("Hello World"))
/// })?;
/// let app = Phial::new(router);
///
/// // inside the host, for every connection
/// app.handle(scope, &mut receive, &mut send).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Phial {
    router: Arc<Router>,
    config: AppConfig,
}

impl Phial {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bind a scope. Nothing is read or sent until [`Connection::serve`].
    pub fn connect(&self, scope: Scope) -> Connection {
        Connection {
            router: Arc::clone(&self.router),
            config: self.config.clone(),
            scope,
        }
    }

    /// [`connect`](Self::connect) and [`serve`](Connection::serve) in one call.
    pub async fn handle<R, S>(
        &self,
        scope: Scope,
        receive: &mut R,
        send: &mut S,
    ) -> Result<(), Error>
    where
        R: Receive + ?Sized,
        S: Sink + ?Sized,
    {
        self.connect(scope).serve(receive, send).await
    }
}

/// One bound connection, ready to be driven by the host's channels.
#[derive(Debug)]
pub struct Connection {
    router: Arc<Router>,
    config: AppConfig,
    scope: Scope,
}

impl Connection {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Run the request through the pipeline and emit exactly one response.
    ///
    /// Non-HTTP scopes are ignored. Only sink failures are returned; view
    /// failures, panics and malformed requests become the server-error response.
    pub async fn serve<R, S>(self, receive: &mut R, send: &mut S) -> Result<(), Error>
    where
        R: Receive + ?Sized,
        S: Sink + ?Sized,
    {
        if !self.scope.is_http() {
            phial_log::debug!(target: "phial::app", "Ignoring {} scope", self.scope.kind);
            return Ok(());
        }

        let response = self.respond(receive).await;

        if self.config.access_log {
            phial_log::info!(
                target: "phial::access",
                "{} {} -> {}",
                self.scope.method(),
                self.scope.path,
                response.status()
            );
        }

        response.send(send).await
    }

    async fn respond<R>(&self, receive: &mut R) -> Response
    where
        R: Receive + ?Sized,
    {
        let request = match assemble(&self.scope, receive, self.config.max_body_size).await {
            Ok(request) => request,
            Err(err) => {
                phial_log::warn!(
                    target: "phial::app",
                    "Could not assemble request for {}: {}",
                    self.scope.path,
                    err
                );
                return self.recover(Request::partial(&self.scope), err).await;
            }
        };

        let (view, params) = self.router.dispatch(request.path());
        match self.invoke(view, request.clone(), params).await {
            Ok(response) => response,
            Err(err) => {
                phial_log::error!(
                    target: "phial::app",
                    "View for {} failed: {}",
                    request.path(),
                    err
                );
                self.recover(request, err).await
            }
        }
    }

    async fn invoke(
        &self,
        view: &BoxedHandler,
        request: Request,
        params: PathParams,
    ) -> Result<Response, Error> {
        let call = async move { view.call(request, params).await };
        if !self.config.catch_panics {
            return call.await;
        }

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(Error::Panic(panic_message(payload))),
        }
    }

    async fn recover(&self, request: Request, error: Error) -> Response {
        let fallback = self.router.handle_server_error(request, error);
        if !self.config.catch_panics {
            return fallback.await;
        }

        match AssertUnwindSafe(fallback).catch_unwind().await {
            Ok(response) => response,
            Err(payload) => {
                phial_log::error!(
                    target: "phial::app",
                    "Server-error view panicked: {}",
                    panic_message(payload)
                );
                Response::internal_server_error(HttpStatus::InternalServerError.reason())
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ReceiveMessage, SendMessage};
    use bytes::Bytes;
    use std::collections::VecDeque;

    struct Script(VecDeque<ReceiveMessage>);

    #[async_trait::async_trait]
    impl Receive for Script {
        async fn receive(&mut self) -> Result<ReceiveMessage, Error> {
            Ok(self.0.pop_front().unwrap_or(ReceiveMessage::Disconnect))
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<SendMessage>);

    #[async_trait::async_trait]
    impl Sink for Recorder {
        async fn send(&mut self, message: SendMessage) -> Result<(), Error> {
            self.0.push(message);
            Ok(())
        }
    }

    async fn run(app: &Phial, scope: Scope, body: &'static [u8]) -> Vec<SendMessage> {
        let mut receive = Script(vec![ReceiveMessage::chunk(body, false)].into());
        let mut sink = Recorder::default();
        app.handle(scope, &mut receive, &mut sink).await.unwrap();
        sink.0
    }

    fn body(messages: &[SendMessage]) -> &[u8] {
        messages[1].body().map(|b| &b[..]).unwrap_or_default()
    }

    fn app() -> Phial {
        let router = Router::new()
            .route("^/$", |_req, _params| async {
                Ok::<_, Error>(Response::text("Hello World"))
            })
            .unwrap()
            .route("^/fail$", |_req, _params| async {
                Err::<Response, _>(Error::handler("view exploded"))
            })
            .unwrap()
            .route("^/panic$", |_req, _params| async {
                if true {
                    panic!("view panicked");
                }
                Ok::<_, Error>("unreachable")
            })
            .unwrap()
            .route("^/(?P<name>[\\w]*)/?$", |_req, params: PathParams| async move {
                Ok::<_, Error>(format!("Hello {}", params.require("name")?))
            })
            .unwrap();
        Phial::new(router)
    }

    #[tokio::test]
    async fn test_hello_world() {
        let sent = run(&app(), Scope::http("GET", "/"), b"").await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].status(), Some(200));
        assert_eq!(body(&sent), b"Hello World");
    }

    #[tokio::test]
    async fn test_named_param_view() {
        let sent = run(&app(), Scope::http("GET", "/phial/"), b"").await;
        assert_eq!(body(&sent), b"Hello phial");
    }

    #[tokio::test]
    async fn test_not_found() {
        let sent = run(&app(), Scope::http("GET", "/blog/articles/"), b"").await;
        assert_eq!(sent[0].status(), Some(404));
        assert_eq!(body(&sent), b"Path /blog/articles/ Not Found");
    }

    #[tokio::test]
    async fn test_view_error_becomes_500() {
        let sent = run(&app(), Scope::http("GET", "/fail"), b"").await;
        assert_eq!(sent[0].status(), Some(500));
        assert_eq!(body(&sent), b"view exploded");
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let sent = run(&app(), Scope::http("GET", "/panic"), b"").await;
        assert_eq!(sent[0].status(), Some(500));
        assert_eq!(body(&sent), b"Handler panicked: view panicked");
    }

    #[tokio::test]
    async fn test_non_http_scope_sends_nothing() {
        let mut scope = Scope::http("GET", "/");
        scope.kind = "lifespan".to_string();
        let sent = run(&app(), scope, b"").await;
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_request_uses_server_error_view() {
        let scope = Scope::http("POST", "/")
            .with_header("content-type", "multipart/form-data; boundary=b");
        let sent = run(&app(), scope, b"not multipart at all").await;
        assert_eq!(sent[0].status(), Some(500));
        assert!(body(&sent).starts_with(b"Malformed multipart body"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let app = app().with_config(AppConfig::default().with_max_body_size(4));
        let sent = run(&app, Scope::http("GET", "/"), b"too long").await;
        assert_eq!(sent[0].status(), Some(500));
        assert!(body(&sent).starts_with(b"Payload too large"));
    }

    #[tokio::test]
    async fn test_server_error_view_sees_request() {
        let router = Router::new()
            .route("^/", |_req, _params| async { Err::<Response, _>(Error::handler("nope")) })
            .unwrap()
            .with_server_error(|req: Request, err: Error| async move {
                Response::text(format!("{} {}: {}", req.method(), req.path(), err))
                    .with_status(err.status_code())
            });
        let sent = run(&Phial::new(router), Scope::http("DELETE", "/thing"), b"").await;
        assert_eq!(sent[0].status(), Some(500));
        assert_eq!(body(&sent), b"DELETE /thing: nope");
    }

    #[tokio::test]
    async fn test_send_failure_is_returned() {
        let mut receive = Script(VecDeque::new());
        let mut sink = |_message: SendMessage| async {
            Err::<(), _>(Error::SendFailed("gone".to_string()))
        };
        let err = app()
            .handle(Scope::http("GET", "/"), &mut receive, &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SendFailed(_)));
    }

    #[tokio::test]
    async fn test_connect_then_serve() {
        let app = app();
        let connection = app.connect(Scope::http("GET", "/"));
        assert_eq!(connection.scope().path, "/");

        let mut receive = Script(VecDeque::new());
        let mut sink = Recorder::default();
        connection.serve(&mut receive, &mut sink).await.unwrap();
        assert_eq!(sink.0[1].body(), Some(&Bytes::from_static(b"Hello World")));
    }

    #[tokio::test]
    async fn test_concurrent_dispatch() {
        let app = app();
        let mut tasks = Vec::new();
        for i in 0..16 {
            let app = app.clone();
            tasks.push(tokio::spawn(async move {
                let path = format!("/user{}", i);
                let sent = run(&app, Scope::http("GET", &path), b"").await;
                (i, body(&sent).to_vec())
            }));
        }
        for task in tasks {
            let (i, body) = task.await.unwrap();
            assert_eq!(body, format!("Hello user{}", i).into_bytes());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failing_requests_do_not_affect_others() {
        let app = app();
        let mut tasks = Vec::new();
        for i in 0..32 {
            let app = app.clone();
            tasks.push(tokio::spawn(async move {
                let path = match i % 3 {
                    0 => "/fail".to_string(),
                    1 => "/panic".to_string(),
                    _ => format!("/user{}", i),
                };
                let sent = run(&app, Scope::http("GET", &path), b"").await;
                (i, sent[0].status(), body(&sent).to_vec())
            }));
        }
        for task in tasks {
            let (i, status, body) = task.await.unwrap();
            match i % 3 {
                0 => {
                    assert_eq!(status, Some(500));
                    assert_eq!(body, b"view exploded");
                }
                1 => {
                    assert_eq!(status, Some(500));
                    assert_eq!(body, b"Handler panicked: view panicked");
                }
                _ => {
                    assert_eq!(status, Some(200));
                    assert_eq!(body, format!("Hello user{}", i).into_bytes());
                }
            }
        }
    }

    #[test]
    fn test_access_log_line() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let logged = app().with_config(AppConfig::default().with_access_log(true));
        let quiet = app();
        let (missing, hello) = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(async {
                let missing = run(&logged, Scope::http("GET", "/no/such/page"), b"").await;
                let hello = run(&quiet, Scope::http("POST", "/"), b"").await;
                (missing, hello)
            })
        });

        // Logging does not change what is sent
        assert_eq!(missing[0].status(), Some(404));
        assert_eq!(body(&missing), b"Path /no/such/page Not Found");
        assert_eq!(hello[0].status(), Some(200));

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("GET /no/such/page -> 404"));
        assert!(!output.contains("POST / -> 200"));
    }
}
