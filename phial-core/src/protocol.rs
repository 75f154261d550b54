//! Application-server protocol types.
//!
//! A host transport calls the application once per connection with a
//! [`Scope`], then drives it with two async channels: a [`Receive`] source
//! yielding request-body chunks and a [`Sink`] accepting response messages.
//! Message shapes serialize with the protocol's `type` tags
//! (`http.request`, `http.response.start`, `http.response.body`).

use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;

/// Per-connection metadata supplied by the host. The core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Protocol type, `"http"` for requests the core handles.
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    /// Absent means `GET`.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub query_string: Bytes,
    #[serde(default)]
    pub headers: Vec<(Bytes, Bytes)>,
}

impl Scope {
    /// An HTTP scope with no query string or headers.
    pub fn http(method: &str, path: &str) -> Self {
        Self {
            kind: "http".to_string(),
            path: path.to_string(),
            method: Some(method.to_string()),
            query_string: Bytes::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query_string = Bytes::copy_from_slice(query.as_bytes());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((
            Bytes::copy_from_slice(name.as_bytes()),
            Bytes::copy_from_slice(value.as_bytes()),
        ));
        self
    }

    pub fn is_http(&self) -> bool {
        self.kind == "http"
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }
}

/// Message yielded by the host's receive channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReceiveMessage {
    #[serde(rename = "http.request")]
    Request {
        #[serde(default)]
        body: Bytes,
        #[serde(default)]
        more_body: bool,
    },
    /// The client went away; no further body follows.
    #[serde(rename = "http.disconnect")]
    Disconnect,
}

impl ReceiveMessage {
    /// A body chunk.
    pub fn chunk(body: impl Into<Bytes>, more_body: bool) -> Self {
        ReceiveMessage::Request {
            body: body.into(),
            more_body,
        }
    }

    /// A terminal message with no body.
    pub fn empty() -> Self {
        ReceiveMessage::chunk(Bytes::new(), false)
    }
}

/// Message consumed by the host's send channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "http.response.start")]
    ResponseStart {
        status: u16,
        headers: Vec<(Bytes, Bytes)>,
    },
    #[serde(rename = "http.response.body")]
    ResponseBody { body: Bytes },
}

impl SendMessage {
    pub fn status(&self) -> Option<u16> {
        match self {
            SendMessage::ResponseStart { status, .. } => Some(*status),
            SendMessage::ResponseBody { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&Bytes> {
        match self {
            SendMessage::ResponseBody { body } => Some(body),
            SendMessage::ResponseStart { .. } => None,
        }
    }
}

/// Source of inbound body messages.
#[async_trait]
pub trait Receive: Send {
    async fn receive(&mut self) -> Result<ReceiveMessage, Error>;
}

/// Outbound message channel.
#[async_trait]
pub trait Sink: Send {
    async fn send(&mut self, message: SendMessage) -> Result<(), Error>;
}

#[async_trait]
impl<F, Fut> Receive for F
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<ReceiveMessage, Error>> + Send + 'static,
{
    async fn receive(&mut self) -> Result<ReceiveMessage, Error> {
        (self)().await
    }
}

#[async_trait]
impl<F, Fut> Sink for F
where
    F: FnMut(SendMessage) -> Fut + Send,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn send(&mut self, message: SendMessage) -> Result<(), Error> {
        (self)(message).await
    }
}

/// [`Receive`] over a tokio channel. A closed channel reads as a disconnect.
pub struct ChannelReceive(pub mpsc::Receiver<ReceiveMessage>);

#[async_trait]
impl Receive for ChannelReceive {
    async fn receive(&mut self) -> Result<ReceiveMessage, Error> {
        Ok(self.0.recv().await.unwrap_or(ReceiveMessage::Disconnect))
    }
}

/// [`Sink`] over a tokio channel.
pub struct ChannelSink(pub mpsc::Sender<SendMessage>);

#[async_trait]
impl Sink for ChannelSink {
    async fn send(&mut self, message: SendMessage) -> Result<(), Error> {
        self.0
            .send(message)
            .await
            .map_err(|_| Error::SendFailed("response channel closed".to_string()))
    }
}
