// Response value and its two-message emission

use crate::protocol::{SendMessage, Sink};
use crate::{Error, HttpStatus};
use bytes::Bytes;
use serde::Serialize;

/// Default content type when a view does not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// What a view produces.
///
/// Extra headers are emitted after `content-type` in insertion order. No
/// `content-length` is added implicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    content_type: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// A 200 `text/html` response.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            status: HttpStatus::Ok.code(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::new(body).with_content_type("text/plain")
    }

    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(body)
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(body).with_content_type("application/json"))
    }

    pub fn not_found(body: impl Into<Bytes>) -> Self {
        Self::new(body).with_status(HttpStatus::NotFound.code())
    }

    pub fn internal_server_error(body: impl Into<Bytes>) -> Self {
        Self::new(body).with_status(HttpStatus::InternalServerError.code())
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Extra headers, excluding content-type.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The `http.response.start` / `http.response.body` pair for this response.
    pub fn into_messages(self) -> [SendMessage; 2] {
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        headers.push((
            Bytes::from_static(b"content-type"),
            Bytes::from(self.content_type),
        ));
        headers.extend(
            self.headers
                .into_iter()
                .map(|(name, value)| (Bytes::from(name), Bytes::from(value))),
        );

        [
            SendMessage::ResponseStart {
                status: self.status,
                headers,
            },
            SendMessage::ResponseBody { body: self.body },
        ]
    }

    /// Emit start then body through `sink`. The body goes out as one chunk.
    pub async fn send<S>(self, sink: &mut S) -> Result<(), Error>
    where
        S: Sink + ?Sized,
    {
        let [start, body] = self.into_messages();
        sink.send(start).await?;
        sink.send(body).await
    }
}

/// Conversion from view return values.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for &'static [u8] {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}
