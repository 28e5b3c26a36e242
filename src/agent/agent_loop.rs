//! The question-answering loop.
//!
//! Each question runs the whole pipeline before the next one is read:
//! connection check, SQL generation, execution, presentation, summary.

use std::sync::Arc;

use futures::StreamExt;

use crate::agent::session::{Session, TurnState};
use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse, StatusUpdate};
use crate::config::PresentationConfig;
use crate::error::Result;
use crate::history::Sender;
use crate::llm::LlmProvider;
use crate::present::{Presentation, ResultPresenter};
use crate::query::{QueryExecutor, QueryGenerator, SummaryGenerator};

/// Answer text when execution produced no rows.
pub const NO_RESULTS_MESSAGE: &str = "No results found or error in query execution.";

/// Everything one turn produced.
#[derive(Debug, Clone, Default)]
pub struct Answer {
    /// The AI turn appended to the log.
    pub text: String,
    pub sql: Option<String>,
    pub presentation: Option<Presentation>,
    /// Errors shown to the user that did not abort the turn.
    pub notices: Vec<String>,
}

impl Answer {
    fn aborted(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }
}

/// Core dependencies for the agent.
pub struct AgentDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub presentation: PresentationConfig,
}

/// Runs the pipeline for each question in a session.
pub struct Agent {
    generator: QueryGenerator,
    summarizer: SummaryGenerator,
    presenter: ResultPresenter,
}

impl Agent {
    pub fn new(deps: AgentDeps) -> Self {
        Self {
            generator: QueryGenerator::new(Arc::clone(&deps.llm)),
            summarizer: SummaryGenerator::new(
                Arc::clone(&deps.llm),
                deps.presentation.summary_sample_rows,
            ),
            presenter: ResultPresenter::from_config(&deps.presentation),
        }
    }

    /// Pull messages from every channel and answer them one at a time.
    ///
    /// Returns when all channel streams end. The session stays open.
    pub async fn run(&self, session: &mut Session, channels: &ChannelManager) -> Result<()> {
        let mut messages = channels.start_all().await?;

        while let Some(msg) = messages.next().await {
            tracing::debug!(channel = %msg.channel, message_id = %msg.id, "Received message");

            let response = match self
                .handle_message_with_status(session, &msg, channels)
                .await
            {
                Some(answer) => OutgoingResponse::from(answer),
                None => OutgoingResponse::text(""),
            };

            if let Err(e) = channels.respond(&msg, response).await {
                tracing::error!("Failed to respond on {}: {}", msg.channel, e);
            }
        }

        tracing::info!("All channels closed");
        Ok(())
    }

    /// Answer one question. Whitespace-only input is ignored and returns `None`.
    pub async fn handle_message(&self, session: &mut Session, content: &str) -> Option<Answer> {
        self.handle_inner(session, content, None).await
    }

    async fn handle_message_with_status(
        &self,
        session: &mut Session,
        msg: &IncomingMessage,
        channels: &ChannelManager,
    ) -> Option<Answer> {
        self.handle_inner(session, &msg.content, Some((msg, channels)))
            .await
    }

    async fn handle_inner(
        &self,
        session: &mut Session,
        content: &str,
        status: Option<(&IncomingMessage, &ChannelManager)>,
    ) -> Option<Answer> {
        let question = content.trim();
        if question.is_empty() {
            return None;
        }

        session.set_state(TurnState::Processing);
        // Transcript failures are logged by the log itself.
        let _ = session.log_mut().append(Sender::Human, question);

        let answer = self.process(session, question, status).await;

        let _ = session.log_mut().append(Sender::Ai, answer.text.clone());
        session.set_state(TurnState::Idle);

        Some(answer)
    }

    async fn process(
        &self,
        session: &Session,
        question: &str,
        status: Option<(&IncomingMessage, &ChannelManager)>,
    ) -> Answer {
        let notify = |update: StatusUpdate| async move {
            if let Some((msg, channels)) = status {
                channels.send_status(msg, update).await;
            }
        };

        let database = session.database();
        if let Err(e) = database.check_connection().await {
            tracing::error!("Database connection unavailable: {}", e);
            return Answer::aborted(format!("Error connecting to database: {}", e));
        }

        notify(StatusUpdate::Thinking("Generating SQL query...".to_string())).await;
        let sql = match self.generator.generate(question).await {
            Ok(sql) => sql,
            Err(e) => {
                tracing::error!("SQL generation failed: {}", e);
                return Answer::aborted(format!("Error generating SQL query: {}", e));
            }
        };
        notify(StatusUpdate::GeneratedSql(sql.clone())).await;

        let execution = QueryExecutor::new(database).execute(&sql).await;
        let mut answer = Answer {
            sql: Some(sql.clone()),
            notices: execution.error.into_iter().collect(),
            ..Default::default()
        };

        let result = execution.result;
        if result.is_empty() {
            answer.text = NO_RESULTS_MESSAGE.to_string();
            return answer;
        }

        match self.presenter.present(&result) {
            Ok(presentation) => answer.presentation = Some(presentation),
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                answer
                    .notices
                    .push(format!("Error creating Excel export: {}", e));
            }
        }

        notify(StatusUpdate::Thinking("Summarizing results...".to_string())).await;
        answer.text = match self.summarizer.summarize(question, &sql, &result).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Summary generation failed: {}", e);
                format!("Error generating summary: {}", e)
            }
        };

        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ConversationLog;
    use crate::query::QueryResult;
    use crate::query::schema::SUMMARY_FALLBACK;
    use crate::testing::{FakeDatabase, ScriptedLlm};

    const COUNT_SQL: &str = "SELECT COUNT(*) AS TrackCount FROM Track;";

    fn count_db() -> FakeDatabase {
        FakeDatabase::new().with_result(
            COUNT_SQL,
            QueryResult::new(
                vec!["trackcount".to_string()],
                vec![vec![Some("3503".to_string())]],
            ),
        )
    }

    fn agent(llm: ScriptedLlm) -> Agent {
        Agent::new(AgentDeps {
            llm: Arc::new(llm),
            presentation: PresentationConfig::default(),
        })
    }

    fn session(db: FakeDatabase) -> Session {
        Session::new(Arc::new(db), ConversationLog::new())
    }

    fn senders(session: &Session) -> Vec<Sender> {
        session.log().turns().iter().map(|t| t.sender).collect()
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let agent = agent(ScriptedLlm::new());
        let mut session = session(count_db());

        assert!(agent.handle_message(&mut session, "   \n").await.is_none());
        assert!(session.log().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_turn_appends_human_then_ai() {
        let agent = agent(
            ScriptedLlm::new()
                .reply(COUNT_SQL)
                .reply("There are 3,503 tracks in the database."),
        );
        let mut session = session(count_db());

        let answer = agent
            .handle_message(&mut session, "How many tracks are there?")
            .await
            .unwrap();

        assert_eq!(answer.text, "There are 3,503 tracks in the database.");
        assert_eq!(answer.sql.as_deref(), Some(COUNT_SQL));
        assert!(answer.notices.is_empty());
        assert!(matches!(answer.presentation, Some(Presentation::Inline(_))));
        assert_eq!(senders(&session), vec![Sender::Human, Sender::Ai]);
        assert_eq!(session.log().turns()[0].content, "How many tracks are there?");
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_sql_gives_no_results_answer() {
        let llm = ScriptedLlm::new().reply("SELEC nonsense");
        let agent = agent(llm);
        let mut session = session(count_db());

        let answer = agent.handle_message(&mut session, "gibberish").await.unwrap();
        assert_eq!(answer.text, NO_RESULTS_MESSAGE);
        assert_eq!(answer.notices.len(), 1);
        assert!(answer.notices[0].starts_with("Error executing SQL query:"));
        assert!(answer.presentation.is_none());
        assert_eq!(senders(&session), vec![Sender::Human, Sender::Ai]);
    }

    #[tokio::test]
    async fn test_generation_failure_aborts_turn() {
        let agent = agent(ScriptedLlm::new().fail_unreachable());
        let db = count_db();
        let mut session = session(db);

        let answer = agent.handle_message(&mut session, "How many tracks?").await.unwrap();
        assert!(answer.text.starts_with("Error generating SQL query:"));
        assert!(answer.sql.is_none());
        assert_eq!(senders(&session), vec![Sender::Human, Sender::Ai]);
    }

    #[tokio::test]
    async fn test_connection_failure_skips_pipeline() {
        let llm = Arc::new(ScriptedLlm::new().reply(COUNT_SQL));
        let agent = Agent::new(AgentDeps {
            llm: llm.clone(),
            presentation: PresentationConfig::default(),
        });
        let db = Arc::new(count_db());
        db.set_unreachable(true);
        let mut session = Session::new(db.clone(), ConversationLog::new());

        let answer = agent.handle_message(&mut session, "How many tracks?").await.unwrap();
        assert!(answer.text.starts_with("Error connecting to database:"));
        assert!(llm.requests().is_empty());
        assert!(db.executed().is_empty());
        assert_eq!(senders(&session), vec![Sender::Human, Sender::Ai]);

        // The next turn reconnects.
        db.set_unreachable(false);
        let answer = agent.handle_message(&mut session, "How many tracks?").await.unwrap();
        assert_eq!(answer.sql.as_deref(), Some(COUNT_SQL));
        assert_eq!(session.log().len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_summary_uses_fallback() {
        let agent = agent(ScriptedLlm::new().reply(COUNT_SQL).fail_malformed());
        let mut session = session(count_db());

        let answer = agent.handle_message(&mut session, "How many tracks?").await.unwrap();
        assert_eq!(answer.text, SUMMARY_FALLBACK);
        assert_eq!(session.log().last().unwrap().content, SUMMARY_FALLBACK);
    }

    #[tokio::test]
    async fn test_summary_transport_failure_keeps_table() {
        let agent = agent(ScriptedLlm::new().reply(COUNT_SQL).fail_unreachable());
        let mut session = session(count_db());

        let answer = agent.handle_message(&mut session, "How many tracks?").await.unwrap();
        assert!(answer.text.starts_with("Error generating summary:"));
        assert!(matches!(answer.presentation, Some(Presentation::Inline(_))));
    }

    #[tokio::test]
    async fn test_run_without_channels_is_a_channel_error() {
        let agent = agent(ScriptedLlm::new());
        let mut session = session(count_db());

        let result = agent.run(&mut session, &ChannelManager::new()).await;
        assert!(matches!(result, Err(crate::error::Error::Channel(_))));
    }

    #[tokio::test]
    async fn test_large_result_is_exported() {
        let sql = "SELECT * FROM Track";
        let rows: Vec<Vec<Option<String>>> = (0..10)
            .map(|i| (0..7).map(|c| Some(format!("{}-{}", i, c))).collect())
            .collect();
        let db = FakeDatabase::new().with_result(
            sql,
            QueryResult::new((0..7).map(|c| format!("c{}", c)).collect(), rows),
        );
        let agent = agent(ScriptedLlm::new().reply(sql).reply("Ten tracks."));
        let mut session = session(db);

        let answer = agent.handle_message(&mut session, "Show tracks").await.unwrap();
        match answer.presentation {
            Some(Presentation::Export(artifact)) => assert_eq!(artifact.row_count, 10),
            other => panic!("expected export, got {:?}", other),
        }
    }
}
