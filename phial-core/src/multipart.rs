//! multipart/form-data parsing
//!
//! Built on `multer`. The assembled body is fed in as a single-chunk stream,
//! so file parts come back as the exact bytes that were sent.

use crate::Error;
use crate::form::{FormValue, PostParams, UploadedFile};
use bytes::Bytes;
use futures_util::stream;
use std::collections::HashMap;

/// Longest boundary RFC 2046 allows.
const MAX_BOUNDARY_LEN: usize = 70;

/// A single decoded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    /// Part headers with lower-cased names
    pub headers: HashMap<String, String>,
    pub data: Bytes,
}

impl Part {
    /// Convert into a POST value. An empty filename counts as a text field.
    pub fn into_value(self) -> FormValue {
        match self.filename {
            Some(filename) if !filename.is_empty() => FormValue::File(UploadedFile::new(
                self.name,
                filename,
                self.headers,
                self.data,
            )),
            _ => FormValue::Text(String::from_utf8_lossy(&self.data).into_owned()),
        }
    }
}

/// Parser bound to one boundary string.
#[derive(Debug, Clone)]
pub struct MultipartParser {
    boundary: String,
}

impl MultipartParser {
    pub fn new(boundary: impl Into<String>) -> Result<Self, Error> {
        let boundary = boundary.into();
        if boundary.is_empty() {
            return Err(Error::Multipart("empty boundary".to_string()));
        }
        if boundary.len() > MAX_BOUNDARY_LEN {
            return Err(Error::Multipart(format!(
                "boundary longer than {} characters",
                MAX_BOUNDARY_LEN
            )));
        }
        Ok(Self { boundary })
    }

    /// Build a parser from a `Content-Type` value such as
    /// `multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW`.
    pub fn from_content_type(content_type: &str) -> Result<Self, Error> {
        Self::new(multer::parse_boundary(content_type)?)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Split `body` into parts, in the order they were sent.
    pub async fn parse(&self, body: Bytes) -> Result<Vec<Part>, Error> {
        let body = stream::once(async move { Ok::<_, std::io::Error>(body) });
        let mut multipart = multer::Multipart::new(body, &self.boundary);
        let mut parts = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field
                .name()
                .map(String::from)
                .ok_or_else(|| Error::Multipart("part without a field name".to_string()))?;
            let filename = field.file_name().map(String::from);
            let headers = field
                .headers()
                .iter()
                .map(|(key, value)| {
                    (
                        key.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let data = field.bytes().await?;

            parts.push(Part {
                name,
                filename,
                headers,
                data,
            });
        }

        Ok(parts)
    }

    /// Parse `body` straight into POST parameters; duplicate names keep the last part.
    pub async fn parse_params(&self, body: Bytes) -> Result<PostParams, Error> {
        let mut params = PostParams::new();
        for part in self.parse(body).await? {
            params.insert(part.name.clone(), part.into_value());
        }
        Ok(params)
    }
}
