//! Chat session: the incremental chat response assembler
//!
//! A [`ChatSession`] owns one transcript. Each [`ChatSession::submit`]
//! appends the user's message, sends the whole transcript plus persona
//! context through a [`ChatTransport`], and grows a single assistant message
//! as deltas stream in. Progress is published as [`SessionEvent`]s so a
//! renderer can draw the reply while it arrives.
//!
//! # State machine
//!
//! ```text
//!          submit()                 body ends / fails
//!   Idle ------------> Streaming ---------------------> Idle
//! ```
//!
//! `submit` and `reset` are rejected with
//! [`PersonaChatError::SessionBusy`] while the session is `Streaming`.
//! Leaving `Streaming` happens in a drop guard, so the busy flag is cleared
//! on every path, including a dropped `submit` future.
//!
//! # Failures
//!
//! Transport errors, non-success statuses, missing bodies, and mid-stream
//! read errors never escape `submit`; they become one assistant message
//! describing the failure.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::chat::decoder::{StreamDecoder, StreamEvent, StreamStats};
use crate::chat::message::{Message, Transcript};
use crate::config::StreamConfig;
use crate::error::{PersonaChatError, Result};
use crate::persona::Persona;
use crate::transport::{ChatRequest, ChatTransport};

/// Prefix of the assistant message synthesized for a failed turn
pub const ERROR_MESSAGE_PREFIX: &str = "Sorry, I couldn't respond";

/// Whether a submission is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for a new submission
    Idle,
    /// A reply is being streamed
    Streaming,
}

/// Progress notification for renderers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A message was added to the transcript
    MessageAppended(Message),
    /// The in-progress assistant message grew
    ContentUpdated {
        /// Id of the assistant message
        id: String,
        /// Text appended by this update
        delta: String,
        /// Full content after the update
        content: String,
    },
    /// The busy flag changed
    BusyChanged(bool),
    /// The transcript was cleared
    Reset,
}

#[derive(Debug)]
struct Inner {
    transcript: Transcript,
    state: SessionState,
}

/// One conversation with one persona
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use persona_chat::chat::ChatSession;
/// use persona_chat::config::{EndpointConfig, StreamConfig};
/// use persona_chat::persona::Persona;
/// use persona_chat::transport::HttpTransport;
///
/// # async fn example() -> persona_chat::error::Result<()> {
/// let transport = Arc::new(HttpTransport::new(&EndpointConfig::default())?);
/// let session = ChatSession::new(transport, Persona::new("Nova", "nova"), &StreamConfig::default());
///
/// session.submit("What is a neutron star?").await?;
/// for message in session.transcript() {
///     println!("{}: {}", message.role, message.content);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    persona: Persona,
    max_rewinds: u32,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    /// Creates an idle session with an empty transcript
    pub fn new(transport: Arc<dyn ChatTransport>, persona: Persona, config: &StreamConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            transport,
            persona,
            max_rewinds: config.max_rewinds,
            inner: Mutex::new(Inner {
                transcript: Transcript::new(),
                state: SessionState::Idle,
            }),
            events,
        }
    }

    /// Sends `text` and streams the persona's reply into the transcript
    ///
    /// Empty text is sent as-is.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaChatError::SessionBusy`] if another submission is
    /// still streaming. Every other failure is recorded in the transcript.
    pub async fn submit(&self, text: impl Into<String>) -> Result<()> {
        let (request, user_message) = {
            let mut inner = self.lock();
            if inner.state == SessionState::Streaming {
                return Err(PersonaChatError::SessionBusy.into());
            }
            inner.state = SessionState::Streaming;
            let user_message = inner.transcript.push(Message::user(text));
            let request = ChatRequest::new(inner.transcript.messages(), &self.persona);
            (request, user_message)
        };

        let _busy = BusyGuard { session: self };
        self.emit(SessionEvent::MessageAppended(user_message));
        self.emit(SessionEvent::BusyChanged(true));

        match self.stream_reply(&request).await {
            Ok(stats) => {
                tracing::debug!(
                    "Reply complete: records={} deltas={} skipped={} rewinds={} dropped={} done={}",
                    stats.records,
                    stats.deltas,
                    stats.skipped_lines,
                    stats.rewinds,
                    stats.dropped_lines,
                    stats.done
                );
            }
            Err(err) => {
                tracing::error!("Chat turn failed: {}", err);
                self.record_failure(&err);
            }
        }

        Ok(())
    }

    /// Clears the transcript
    ///
    /// # Errors
    ///
    /// Returns [`PersonaChatError::SessionBusy`] while a reply is streaming.
    pub fn reset(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.state == SessionState::Streaming {
                return Err(PersonaChatError::SessionBusy.into());
            }
            inner.transcript.clear();
        }
        tracing::debug!("Transcript reset");
        self.emit(SessionEvent::Reset);
        Ok(())
    }

    /// Snapshot of the transcript
    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.messages().to_vec()
    }

    /// Whether a reply is streaming
    pub fn busy(&self) -> bool {
        self.state() == SessionState::Streaming
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Persona this session talks to
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Subscribes to progress events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn stream_reply(&self, request: &ChatRequest) -> Result<StreamStats> {
        let mut body = self.transport.open(request).await?;
        let mut decoder = StreamDecoder::new(self.max_rewinds);
        let mut content = String::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let events = decoder.feed(&chunk);
            self.apply(events, &mut content);
            if decoder.is_done() {
                break;
            }
        }

        let events = decoder.finish();
        self.apply(events, &mut content);

        Ok(decoder.stats())
    }

    fn apply(&self, events: Vec<StreamEvent>, content: &mut String) {
        for event in events {
            let StreamEvent::Delta(delta) = event else {
                continue;
            };
            content.push_str(&delta);

            let (message, created) = self.lock().transcript.upsert_streaming(content.as_str());
            if created {
                self.emit(SessionEvent::MessageAppended(message));
            } else {
                self.emit(SessionEvent::ContentUpdated {
                    id: message.id,
                    delta,
                    content: message.content,
                });
            }
        }
    }

    fn record_failure(&self, err: &anyhow::Error) {
        let text = format!("{}: {}", ERROR_MESSAGE_PREFIX, err);
        let message = self.lock().transcript.push(Message::assistant(text));
        self.emit(SessionEvent::MessageAppended(message));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the session to `Idle` when the submission ends, however it ends
struct BusyGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        {
            let mut inner = self.session.lock();
            inner.transcript.finish_streaming();
            inner.state = SessionState::Idle;
        }
        self.session.emit(SessionEvent::BusyChanged(false));
    }
}
