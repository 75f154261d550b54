// Test client that drives a Phial app through mock channels

use crate::mock::{MockReceive, SendMock};
use bytes::{Bytes, BytesMut};
use phial_core::{Error, Phial, Router, Scope, SendMessage};
use serde::de::DeserializeOwned;

/// Drives a [`Phial`] application end to end without a host.
#[derive(Debug, Clone)]
pub struct TestClient {
    app: Phial,
}

impl TestClient {
    pub fn new(app: Phial) -> Self {
        Self { app }
    }

    pub fn from_router(router: Router) -> Self {
        Self::new(Phial::new(router))
    }

    pub fn app(&self) -> &Phial {
        &self.app
    }

    /// GET `path`; anything after `?` becomes the query string.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequest::get(path)).await
    }

    /// POST a multipart form to `path`.
    pub async fn post_multipart(&self, path: &str, form: MultipartForm) -> TestResponse {
        self.send(TestRequest::post(path).multipart(form)).await
    }

    pub async fn send(&self, request: TestRequest) -> TestResponse {
        let (scope, receive) = request.into_parts();
        self.request(scope, receive).await
    }

    /// Run a raw scope against a scripted receive channel.
    pub async fn request(&self, scope: Scope, mut receive: MockReceive) -> TestResponse {
        let sink = SendMock::new();
        let mut send = sink.clone();
        let result = self.app.handle(scope, &mut receive, &mut send).await;
        TestResponse {
            messages: sink.sent(),
            error: result.err(),
        }
    }
}

/// Builder for a scope plus its body chunks.
#[derive(Debug, Clone)]
pub struct TestRequest {
    scope: Scope,
    chunks: Vec<Bytes>,
}

impl TestRequest {
    pub fn new(method: &str, path: &str) -> Self {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        Self {
            scope: Scope::http(method, path).with_query(query),
            chunks: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    pub fn query(mut self, query: &str) -> Self {
        self.scope = self.scope.with_query(query);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.scope = self.scope.with_header(name, value);
        self
    }

    /// Send `body` as a single chunk.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.chunks = vec![body.into()];
        self
    }

    /// Split the body over several receive messages.
    pub fn chunked<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Multipart body with matching content-type and content-length headers.
    pub fn multipart(self, form: MultipartForm) -> Self {
        let body = form.to_bytes();
        self.header("content-type", &form.content_type())
            .header("content-length", &body.len().to_string())
            .body(body)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn into_parts(self) -> (Scope, MockReceive) {
        (self.scope, MockReceive::chunks(self.chunks))
    }
}

/// Multipart/form-data body builder.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
struct FormPart {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl MultipartForm {
    /// A form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("phial-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            filename: None,
            content_type: None,
            data: Bytes::copy_from_slice(value.as_bytes()),
        });
        self
    }

    pub fn file(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            filename: Some(filename.to_string()),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        });
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode with CRLF line breaks.
    pub fn to_bytes(&self) -> Bytes {
        let mut body = BytesMut::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", filename));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        body.freeze()
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// What the application sent for one test request.
#[derive(Debug)]
pub struct TestResponse {
    messages: Vec<SendMessage>,
    error: Option<Error>,
}

impl TestResponse {
    /// Raw messages in send order
    pub fn messages(&self) -> &[SendMessage] {
        &self.messages
    }

    /// Error returned to the host, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether nothing at all was sent.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn status(&self) -> Option<u16> {
        self.messages.iter().find_map(SendMessage::status)
    }

    /// Response headers, lossily decoded, in emitted order.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.messages
            .iter()
            .find_map(|message| match message {
                SendMessage::ResponseStart { headers, .. } => Some(headers),
                SendMessage::ResponseBody { .. } => None,
            })
            .map(|headers| {
                headers
                    .iter()
                    .map(|(name, value)| {
                        (
                            String::from_utf8_lossy(name).into_owned(),
                            String::from_utf8_lossy(value).into_owned(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
    }

    /// All body chunks concatenated.
    pub fn body(&self) -> Bytes {
        let mut body = BytesMut::new();
        for chunk in self.messages.iter().filter_map(SendMessage::body) {
            body.extend_from_slice(chunk);
        }
        body.freeze()
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body()).into_owned()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phial_core::{PathParams, Request, Response};

    fn client() -> TestClient {
        let router = Router::new()
            .route("^/echo$", |req: Request, _params: PathParams| async move {
                let name = req.query("name").unwrap_or("nobody").to_string();
                Ok::<_, Error>(Response::text(name).with_header("x-echo", "1"))
            })
            .unwrap();
        TestClient::from_router(router)
    }

    #[tokio::test]
    async fn test_get_with_query() {
        let response = client().get("/echo?name=phial").await;
        assert_eq!(response.status(), Some(200));
        assert_eq!(response.body_string(), "phial");
        assert_eq!(response.content_type().as_deref(), Some("text/plain"));
        assert_eq!(response.header("X-Echo").as_deref(), Some("1"));
        assert!(response.error().is_none());
    }

    #[tokio::test]
    async fn test_headers_keep_emitted_order() {
        let response = client().get("/echo").await;
        let names: Vec<String> = response.headers().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["content-type", "x-echo"]);
    }

    #[test]
    fn test_request_builder_splits_query() {
        let request = TestRequest::get("/search?q=rust&q=web").header("accept", "text/html");
        assert_eq!(request.scope().path, "/search");
        assert_eq!(&request.scope().query_string[..], b"q=rust&q=web");
        assert_eq!(request.scope().headers.len(), 1);
    }

    #[test]
    fn test_multipart_form_encoding() {
        let form = MultipartForm::with_boundary("xyz")
            .text("title", "hi")
            .file("upload", "a.txt", "text/plain", "data");
        assert_eq!(form.content_type(), "multipart/form-data; boundary=xyz");

        let body = form.to_bytes();
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--xyz\r\nContent-Disposition: form-data; name=\"title\"\r\n"));
        assert!(text.contains("name=\"title\"\r\n\r\nhi\r\n--xyz\r\n"));
        assert!(text.contains("filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\ndata\r\n"));
        assert!(text.ends_with("--xyz--\r\n"));
    }

    #[test]
    fn test_random_boundaries_differ() {
        assert_ne!(MultipartForm::new().boundary(), MultipartForm::new().boundary());
    }
}
