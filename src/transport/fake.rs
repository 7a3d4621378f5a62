//! In-process fake transport for chat session tests
//!
//! [`FakeTransport`] replays scripted replies without any network I/O. Each
//! call to `open` pops the next [`ScriptedReply`] and records the request it
//! was given so tests can inspect the outbound payload.
//!
//! A reply can hold a gate: the body stream pauses before its first chunk
//! until the test releases the gate, which makes "request still streaming"
//! states observable.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::Notify;

use crate::error::{PersonaChatError, Result};
use crate::transport::{ByteStream, ChatRequest, ChatTransport};

/// One scripted response
#[derive(Debug)]
pub enum ScriptedReply {
    /// Stream these chunks, in order, then end the body
    Chunks(Vec<Vec<u8>>),
    /// Stream these chunks, then fail the body with a read error
    ChunksThenError(Vec<Vec<u8>>, String),
    /// Fail before any body is returned
    Fail(PersonaChatError),
}

impl ScriptedReply {
    /// Convenience constructor from string chunks
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Chunks(
            chunks
                .into_iter()
                .map(|c| c.as_ref().as_bytes().to_vec())
                .collect(),
        )
    }
}

/// Scripted, in-memory [`ChatTransport`]
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<(ScriptedReply, Option<Arc<Notify>>)>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeTransport {
    /// Creates a transport with no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next `open` call
    pub fn push_reply(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .expect("fake transport lock poisoned")
            .push_back((reply, None));
    }

    /// Queues a reply whose body waits until the returned gate is notified
    pub fn push_gated_reply(&self, reply: ScriptedReply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.replies
            .lock()
            .expect("fake transport lock poisoned")
            .push_back((reply, Some(Arc::clone(&gate))));
        gate
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .expect("fake transport lock poisoned")
            .clone()
    }
}

#[async_trait::async_trait]
impl ChatTransport for FakeTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.requests
            .lock()
            .expect("fake transport lock poisoned")
            .push(request.clone());

        let next = self
            .replies
            .lock()
            .expect("fake transport lock poisoned")
            .pop_front();
        let (reply, gate) = next.ok_or_else(|| {
            PersonaChatError::Transport("no scripted reply left".to_string())
        })?;

        let (chunks, trailing_error) = match reply {
            ScriptedReply::Fail(err) => return Err(err.into()),
            ScriptedReply::Chunks(chunks) => (chunks, None),
            ScriptedReply::ChunksThenError(chunks, message) => (chunks, Some(message)),
        };

        let mut items: Vec<Result<Bytes>> =
            chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
        if let Some(message) = trailing_error {
            items.push(Err(PersonaChatError::Stream(message).into()));
        }

        let body = futures::stream::iter(items);
        match gate {
            Some(gate) => {
                let wait = futures::stream::once(async move { gate.notified().await })
                    .filter_map(|_| async { None::<Result<Bytes>> });
                Ok(Box::pin(wait.chain(body)))
            }
            None => Ok(Box::pin(body)),
        }
    }
}
