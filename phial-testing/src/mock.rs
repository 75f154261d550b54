// Scripted receive channel and recording send channel

use async_trait::async_trait;
use bytes::Bytes;
use phial_core::{Error, Receive, ReceiveMessage, SendMessage, Sink};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Records every message the application sends.
///
/// Clones share the same log, so a clone can be handed to the app while the
/// test keeps the original for inspection.
#[derive(Clone, Default)]
pub struct SendMock {
    sent: Arc<Mutex<Vec<SendMessage>>>,
    fail: bool,
}

impl SendMock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every send fails, as if the client hung up.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Snapshot of the messages sent so far
    pub fn sent(&self) -> Vec<SendMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Sink for SendMock {
    async fn send(&mut self, message: SendMessage) -> Result<(), Error> {
        if self.fail {
            return Err(Error::SendFailed("mock sink closed".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Plays back a fixed list of receive messages.
///
/// Reading past the end is a protocol error: a well-behaved application
/// stops at the first message without `more_body`.
#[derive(Debug, Clone, Default)]
pub struct MockReceive {
    messages: VecDeque<ReceiveMessage>,
    calls: usize,
}

impl MockReceive {
    pub fn new(messages: impl IntoIterator<Item = ReceiveMessage>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
            calls: 0,
        }
    }

    /// One final message with no body.
    pub fn empty() -> Self {
        Self::new([ReceiveMessage::empty()])
    }

    /// The whole body in one final message.
    pub fn body(body: impl Into<Bytes>) -> Self {
        Self::new([ReceiveMessage::chunk(body, false)])
    }

    /// One message per chunk, `more_body` set on all but the last.
    pub fn chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().map(Into::into).collect();
        if chunks.is_empty() {
            return Self::empty();
        }
        let last = chunks.len() - 1;
        Self::new(
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| ReceiveMessage::chunk(chunk, i < last)),
        )
    }

    /// Append a disconnect after the scripted messages.
    pub fn then_disconnect(mut self) -> Self {
        self.messages.push_back(ReceiveMessage::Disconnect);
        self
    }

    /// How many times the application called receive.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

#[async_trait]
impl Receive for MockReceive {
    async fn receive(&mut self) -> Result<ReceiveMessage, Error> {
        self.calls += 1;
        self.messages
            .pop_front()
            .ok_or_else(|| Error::Protocol("receive called after the final message".to_string()))
    }
}
