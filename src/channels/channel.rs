//! Channel trait and message types.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::agent::Answer;
use crate::error::ChannelError;
use crate::present::Presentation;

/// A question received from a conversation surface.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Unique message ID.
    pub id: Uuid,
    /// Channel this message came from.
    pub channel: String,
    /// User identifier within the channel.
    pub user_id: String,
    /// Message content.
    pub content: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// Create a new incoming message.
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            content: content.into(),
            received_at: Utc::now(),
        }
    }
}

/// Stream of incoming messages.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Response to send back to a channel.
#[derive(Debug, Clone, Default)]
pub struct OutgoingResponse {
    /// The AI answer text (summary, fallback or error).
    pub content: String,
    /// SQL that was run, if generation got that far.
    pub sql: Option<String>,
    /// Inline table or spreadsheet download.
    pub presentation: Option<Presentation>,
    /// Errors surfaced during the turn that did not end it.
    pub notices: Vec<String>,
}

impl OutgoingResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

impl From<Answer> for OutgoingResponse {
    fn from(answer: Answer) -> Self {
        Self {
            content: answer.text,
            sql: answer.sql,
            presentation: answer.presentation,
            notices: answer.notices,
        }
    }
}

/// Status update types for showing pipeline activity.
#[derive(Debug, Clone)]
pub enum StatusUpdate {
    /// A pipeline step started.
    Thinking(String),
    /// The SQL about to be executed.
    GeneratedSql(String),
}

/// Trait for conversation surfaces.
///
/// Channels receive questions and hand them to the agent as a stream. They
/// also render the answers.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name (e.g., "repl", "http").
    fn name(&self) -> &str;

    /// Start listening for messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send the answer for `msg` back to the user.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Send a status update for the message being processed.
    ///
    /// Default implementation does nothing (for channels that don't support status).
    async fn send_status(
        &self,
        _msg: &IncomingMessage,
        _status: StatusUpdate,
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Check if the channel is healthy.
    async fn health_check(&self) -> Result<(), ChannelError>;

    /// Gracefully shut down the channel.
    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
