//! Query-string and form value types

use crate::Error;
use bytes::Bytes;
use bytes::buf::{Buf, Reader};
use std::collections::HashMap;
use std::path::Path;

/// GET parameters: every value supplied for a name, in order.
pub type QueryParams = HashMap<String, Vec<String>>;

/// POST parameters from a multipart body. Later parts overwrite earlier ones.
pub type PostParams = HashMap<String, FormValue>;

/// Parse a percent-encoded query string, keeping repeated keys.
///
/// Pairs with an empty value are dropped and `+` decodes to a space.
pub fn parse_query(raw: &[u8]) -> Result<QueryParams, Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw)
        .map_err(|e| Error::MalformedQuery(e.to_string()))?;

    let mut params = QueryParams::new();
    for (name, value) in pairs {
        if value.is_empty() {
            continue;
        }
        params.entry(name).or_default().push(value);
    }
    Ok(params)
}

/// One POST field: plain text or an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(UploadedFile),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            FormValue::File(file) => Some(file),
            FormValue::Text(_) => None,
        }
    }
}

/// A file part from a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was posted under
    pub field_name: String,
    /// Filename as sent by the client
    pub file_name: String,
    /// The part's own headers, names lower-cased
    pub headers: HashMap<String, String>,
    content: Bytes,
}

impl UploadedFile {
    pub fn new(
        field_name: String,
        file_name: String,
        headers: HashMap<String, String>,
        content: Bytes,
    ) -> Self {
        Self {
            field_name,
            file_name,
            headers,
            content,
        }
    }

    /// The part's declared MIME type, `application/octet-stream` if absent.
    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or("application/octet-stream")
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// A fresh `std::io::Read` handle over the file bytes.
    pub fn reader(&self) -> Reader<Bytes> {
        self.content.clone().reader()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// Write the file to `path`.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        tokio::fs::write(path, &self.content).await?;
        Ok(())
    }
}
