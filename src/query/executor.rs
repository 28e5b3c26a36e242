//! Runs generated SQL and absorbs execution failures.

use std::sync::Arc;

use crate::db::Database;
use crate::query::QueryResult;

/// What came back from running one statement.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub result: QueryResult,
    /// User-facing error text when execution failed.
    pub error: Option<String>,
}

impl Execution {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Executes SQL text against the session database.
pub struct QueryExecutor {
    database: Arc<dyn Database>,
}

impl QueryExecutor {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    /// Execute `sql` verbatim.
    ///
    /// Never fails: a database error becomes an empty result plus a notice.
    pub async fn execute(&self, sql: &str) -> Execution {
        match self.database.run_query(sql).await {
            Ok(result) => {
                tracing::debug!(
                    rows = result.row_count(),
                    columns = result.column_count(),
                    "Query executed"
                );
                Execution {
                    result,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(sql = %sql, "Query execution failed: {}", e);
                Execution {
                    result: QueryResult::empty(),
                    error: Some(format!("Error executing SQL query: {}", e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDatabase;

    #[tokio::test]
    async fn test_execute_returns_rows() {
        let db = Arc::new(FakeDatabase::new().with_result(
            "SELECT COUNT(*) FROM Track",
            QueryResult::new(vec!["count".to_string()], vec![vec![Some("3503".to_string())]]),
        ));
        let executor = QueryExecutor::new(db.clone());

        let execution = executor.execute("SELECT COUNT(*) FROM Track").await;
        assert!(!execution.failed());
        assert_eq!(execution.result.row_count(), 1);
        assert_eq!(execution.result.rows[0][0].as_deref(), Some("3503"));
        assert_eq!(db.executed(), vec!["SELECT COUNT(*) FROM Track".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_sql_yields_empty_result() {
        let db = Arc::new(FakeDatabase::new());
        let executor = QueryExecutor::new(db);

        let execution = executor.execute("SELEC * FORM Track").await;
        assert!(execution.failed());
        assert!(execution.result.is_empty());
        assert_eq!(execution.result, QueryResult::empty());
        assert!(
            execution
                .error
                .unwrap()
                .starts_with("Error executing SQL query: ")
        );
    }
}
