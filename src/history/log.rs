//! Append-only conversation log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TranscriptError;
use crate::history::Transcript;

/// Who said it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Human,
    #[serde(rename = "AI")]
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Human => write!(f, "Human"),
            Sender::Ai => write!(f, "AI"),
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered record of the session's messages.
///
/// Turns can only be appended; readers get shared references.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
    transcript: Option<Transcript>,
}

impl ConversationLog {
    /// An empty log kept only in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty log that also mirrors each turn to `transcript`.
    pub fn with_transcript(transcript: Transcript) -> Self {
        Self {
            turns: Vec::new(),
            transcript: Some(transcript),
        }
    }

    /// Append a turn and return a reference to it.
    ///
    /// The in-memory log always grows. A transcript write failure is logged
    /// and returned after the turn is recorded.
    pub fn append(
        &mut self,
        sender: Sender,
        content: impl Into<String>,
    ) -> Result<&ConversationTurn, TranscriptError> {
        let turn = ConversationTurn::new(sender, content);

        let persisted = match &self.transcript {
            Some(transcript) => transcript.append(&turn).inspect_err(|e| {
                tracing::warn!("Failed to write transcript entry: {}", e);
            }),
            None => Ok(()),
        };

        self.turns.push(turn);
        persisted?;
        // Just pushed, so the log is non-empty.
        Ok(&self.turns[self.turns.len() - 1])
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }
}
