//! Test doubles for the model and the database.
//!
//! Model output is non-deterministic, so pipeline tests script it instead.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::db::Database;
use crate::error::{DatabaseError, LlmError};
use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use crate::query::QueryResult;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync>;

/// An [`LlmProvider`] that replays scripted replies in order.
///
/// Once the script runs out the responder, if any, answers; otherwise the
/// call fails as a malformed response.
#[derive(Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()))
    }

    /// Queue a transport failure.
    pub fn fail_unreachable(self) -> Self {
        self.push(Err(LlmError::RequestFailed {
            provider: "scripted".to_string(),
            reason: "connection refused".to_string(),
        }))
    }

    /// Queue a reply the provider could not decode.
    pub fn fail_malformed(self) -> Self {
        self.push(Err(LlmError::InvalidResponse {
            provider: "scripted".to_string(),
            reason: "No choices in response".to_string(),
        }))
    }

    /// Answer every request past the script with `f`.
    pub fn with_responder(
        mut self,
        f: impl Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(f));
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(self, item: Result<String, LlmError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match (next, &self.responder) {
            (Some(item), _) => item?,
            (None, Some(responder)) => responder(&request)?,
            (None, None) => {
                return Err(LlmError::InvalidResponse {
                    provider: "scripted".to_string(),
                    reason: "script exhausted".to_string(),
                });
            }
        };

        Ok(CompletionResponse {
            content,
            finish_reason: FinishReason::Stop,
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

/// An in-memory [`Database`] with canned results per statement.
///
/// Statements without a canned result fail like a syntax error.
#[derive(Default)]
pub struct FakeDatabase {
    results: HashMap<String, QueryResult>,
    unreachable: AtomicBool,
    closed: AtomicBool,
    executed: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `result`. Matching ignores a trailing semicolon.
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results.insert(normalize(sql), result);
        self
    }

    /// Make connection checks fail until cleared.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Statements passed to `run_query`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

fn normalize(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim().to_string()
}

#[async_trait]
impl Database for FakeDatabase {
    async fn check_connection(&self) -> Result<(), DatabaseError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DatabaseError::Closed);
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Pool(
                "error connecting to server: Connection refused".to_string(),
            ));
        }
        Ok(())
    }

    async fn run_query(&self, sql: &str) -> Result<QueryResult, DatabaseError> {
        self.check_connection().await?;
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        self.results
            .get(&normalize(sql))
            .cloned()
            .ok_or_else(|| DatabaseError::Query(format!("syntax error in \"{}\"", sql)))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
