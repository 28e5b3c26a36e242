//! Database abstraction layer.

mod store;

pub use store::Store;

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::query::QueryResult;

/// The relational database questions are answered from.
#[async_trait]
pub trait Database: Send + Sync {
    /// Make sure a live connection is available, reconnecting if it is absent.
    async fn check_connection(&self) -> Result<(), DatabaseError>;

    /// Run one SQL statement verbatim and collect its rows.
    async fn run_query(&self, sql: &str) -> Result<QueryResult, DatabaseError>;

    /// Release the connection. Later calls fail with [`DatabaseError::Closed`].
    async fn close(&self);
}
