// Request assembly from a scope and the streamed body

use crate::form::{FormValue, PostParams, QueryParams, UploadedFile, parse_query};
use crate::multipart::MultipartParser;
use crate::protocol::{Receive, ReceiveMessage, Scope};
use crate::Error;
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// An incoming request, immutable once assembled.
#[derive(Debug, Clone)]
pub struct Request {
    path: String,
    method: String,
    headers: HashMap<String, String>,
    content_type: Option<String>,
    body: Bytes,
    get: Option<QueryParams>,
    post: Option<PostParams>,
}

impl Request {
    /// Decode the scope and parse `body` according to the method.
    pub async fn from_parts(scope: &Scope, body: Bytes) -> Result<Self, Error> {
        let mut headers = HashMap::with_capacity(scope.headers.len());
        for (name, value) in &scope.headers {
            let name = std::str::from_utf8(name)
                .map_err(|_| Error::MalformedHeader("header name is not UTF-8".to_string()))?;
            let value = std::str::from_utf8(value)
                .map_err(|_| Error::MalformedHeader(format!("value of {} is not UTF-8", name)))?;
            headers.insert(name.to_string(), value.to_string());
        }

        let mut request = Self {
            path: scope.path.clone(),
            method: scope.method().to_string(),
            content_type: headers.get("content-type").cloned(),
            headers,
            body,
            get: None,
            post: None,
        };

        match request.method.as_str() {
            "GET" => request.get = Some(parse_query(&scope.query_string)?),
            "POST" => request.post = request.parse_post().await?,
            _ => {}
        }

        Ok(request)
    }

    /// Best-effort request for error reporting: lossy headers, no parameters.
    pub fn partial(scope: &Scope) -> Self {
        let headers: HashMap<String, String> = scope
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(name).into_owned(),
                    String::from_utf8_lossy(value).into_owned(),
                )
            })
            .collect();

        Self {
            path: scope.path.clone(),
            method: scope.method().to_string(),
            content_type: headers.get("content-type").cloned(),
            headers,
            body: Bytes::new(),
            get: None,
            post: None,
        }
    }

    async fn parse_post(&self) -> Result<Option<PostParams>, Error> {
        let Some(content_type) = self.content_type.as_deref() else {
            return Ok(None);
        };
        let is_multipart = content_type
            .get(..10)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"));
        if !is_multipart {
            return Ok(None);
        }

        let body = match self.headers.get("content-length") {
            Some(raw) => {
                let declared: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidContentLength(raw.clone()))?;
                self.body.slice(..declared.min(self.body.len()))
            }
            None => self.body.clone(),
        };

        let parser = MultipartParser::from_content_type(content_type)?;
        parser.parse_params(body).await.map(Some)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// GET parameters; `None` unless the method is GET.
    pub fn get_params(&self) -> Option<&QueryParams> {
        self.get.as_ref()
    }

    /// POST parameters; `None` unless this is a multipart POST.
    pub fn post_params(&self) -> Option<&PostParams> {
        self.post.as_ref()
    }

    /// First GET value for `name`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_all(name).first().map(String::as_str)
    }

    /// Every GET value for `name`.
    pub fn query_all(&self, name: &str) -> &[String] {
        self.get
            .as_ref()
            .and_then(|params| params.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn form(&self, name: &str) -> Option<&FormValue> {
        self.post.as_ref().and_then(|params| params.get(name))
    }

    pub fn form_text(&self, name: &str) -> Option<&str> {
        self.form(name).and_then(FormValue::as_text)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.form(name).and_then(FormValue::as_file)
    }
}

/// Drain body chunks until the host reports no more.
///
/// A disconnect ends the body early. `limit` caps the accumulated size.
pub async fn read_body<R>(receive: &mut R, limit: Option<usize>) -> Result<Bytes, Error>
where
    R: Receive + ?Sized,
{
    let mut body = BytesMut::new();

    loop {
        match receive.receive().await? {
            ReceiveMessage::Request { body: chunk, more_body } => {
                if let Some(limit) = limit {
                    let size = body.len() + chunk.len();
                    if size > limit {
                        return Err(Error::PayloadTooLarge { size, limit });
                    }
                }
                body.extend_from_slice(&chunk);
                if !more_body {
                    break;
                }
            }
            ReceiveMessage::Disconnect => {
                phial_log::debug!(target: "phial::request", "client disconnected mid-body");
                break;
            }
        }
    }

    Ok(body.freeze())
}

/// Read the full body, then build the [`Request`].
pub async fn assemble<R>(
    scope: &Scope,
    receive: &mut R,
    limit: Option<usize>,
) -> Result<Request, Error>
where
    R: Receive + ?Sized,
{
    let body = read_body(receive, limit).await?;
    Request::from_parts(scope, body).await
}
