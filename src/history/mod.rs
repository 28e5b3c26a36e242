//! Conversation history.
//!
//! The session owns a [`ConversationLog`]; each appended turn can also be
//! mirrored to a JSON-lines [`Transcript`] on disk.

mod log;
mod transcript;

pub use log::{ConversationLog, ConversationTurn, Sender};
pub use transcript::Transcript;
