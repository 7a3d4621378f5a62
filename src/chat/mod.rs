//! Chat core: transcript types, the streamed body decoder, and the session
//!
//! - [`message`] -- `Role`, `Message`, and the append-only `Transcript`
//! - [`decoder`] -- incremental `data:` record parser for response bodies
//! - [`session`] -- `ChatSession`, which submits turns and assembles replies

pub mod decoder;
pub mod message;
pub mod session;

pub use decoder::{StreamDecoder, StreamEvent, StreamStats};
pub use message::{Message, Role, Transcript};
pub use session::{ChatSession, SessionEvent, SessionState};
