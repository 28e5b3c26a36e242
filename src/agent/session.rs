//! The conversation session.
//!
//! A session owns everything one conversation needs: the append-only log and
//! the database handle. It is opened once, passed explicitly to the agent for
//! every turn, and closed once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::db::{Database, Store};
use crate::error::DatabaseError;
use crate::history::{ConversationLog, Transcript};

/// Where the session is in its request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the next question.
    Idle,
    /// Running the pipeline for one question.
    Processing,
}

/// One conversation with its log and database connection.
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    log: ConversationLog,
    database: Arc<dyn Database>,
    state: TurnState,
}

impl Session {
    /// Start a session with an empty log over an already-open database.
    pub fn new(database: Arc<dyn Database>, log: ConversationLog) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            log,
            database,
            state: TurnState::Idle,
        }
    }

    /// Set up the configured database pool and start a session.
    ///
    /// Fails only on an unusable configuration. A server that is down is
    /// reported per turn by the connection check.
    pub async fn open(config: &Config) -> Result<Self, DatabaseError> {
        let store = Store::new(&config.database).await?;
        let log = match &config.history.transcript_path {
            Some(path) => ConversationLog::with_transcript(Transcript::new(path)),
            None => ConversationLog::new(),
        };
        let session = Self::new(Arc::new(store), log);
        tracing::info!(session_id = %session.id, "Session started");
        Ok(session)
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub(crate) fn log_mut(&mut self) -> &mut ConversationLog {
        &mut self.log
    }

    pub fn database(&self) -> Arc<dyn Database> {
        Arc::clone(&self.database)
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TurnState) {
        self.state = state;
    }

    /// End the session and release the database connection.
    pub async fn close(self) {
        self.database.close().await;
        tracing::info!(
            session_id = %self.id,
            turns = self.log.len(),
            "Session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDatabase;

    #[tokio::test]
    async fn test_new_session_is_idle_and_empty() {
        let session = Session::new(Arc::new(FakeDatabase::new()), ConversationLog::new());
        assert_eq!(session.state(), TurnState::Idle);
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_database() {
        let db = Arc::new(FakeDatabase::new());
        let session = Session::new(db.clone(), ConversationLog::new());
        assert!(!db.is_closed());

        session.close().await;
        assert!(db.is_closed());
    }
}
