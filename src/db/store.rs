//! PostgreSQL store backed by a single-connection pool.

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use secrecy::ExposeSecret;
use tokio_postgres::{NoTls, SimpleQueryMessage};

use crate::config::DatabaseConfig;
use crate::db::Database;
use crate::error::DatabaseError;
use crate::query::QueryResult;

/// Database store for the session.
pub struct Store {
    pool: Pool,
}

impl Store {
    /// Create a new store and try a first connection.
    ///
    /// An unreachable server is only logged; every later call reconnects
    /// through the pool, so turns report the failure until it comes back.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut cfg = Config::new();
        match config.url() {
            Some(url) => cfg.url = Some(url.to_string()),
            None => {
                cfg.host = Some(config.host.clone());
                cfg.port = Some(config.port);
                cfg.user = config.user.clone();
                cfg.password = config
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string());
                cfg.dbname = Some(config.name.clone());
            }
        }
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        match pool.get().await {
            Ok(_) => tracing::info!("Connected to database {}", config.display_target()),
            Err(e) => tracing::warn!(
                "Database {} unreachable at startup: {}",
                config.display_target(),
                e
            ),
        }

        Ok(Self { pool })
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> Result<deadpool_postgres::Object, DatabaseError> {
        if self.pool.is_closed() {
            return Err(DatabaseError::Closed);
        }
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Database for Store {
    async fn check_connection(&self) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        if conn.is_closed() {
            return Err(DatabaseError::Pool("connection closed by server".to_string()));
        }
        Ok(())
    }

    async fn run_query(&self, sql: &str) -> Result<QueryResult, DatabaseError> {
        // The pooled object goes back to the pool when it drops, on every path.
        let conn = self.conn().await?;
        let messages = conn.simple_query(sql).await?;
        Ok(collect_rows(messages))
    }

    async fn close(&self) {
        self.pool.close();
        tracing::debug!("Database pool closed");
    }
}

/// Fold simple-query messages into a result.
///
/// When the text holds several statements, only the last one that returned a
/// row description is kept.
fn collect_rows(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut result = QueryResult::empty();

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                result = QueryResult::new(
                    columns.iter().map(|c| c.name().to_string()).collect(),
                    Vec::new(),
                );
            }
            SimpleQueryMessage::Row(row) => {
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let values = (0..row.len())
                    .map(|i| row.get(i).map(str::to_string))
                    .collect();
                result.rows.push(values);
            }
            _ => {}
        }
    }

    result
}
