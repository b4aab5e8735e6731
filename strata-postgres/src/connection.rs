//! PostgreSQL connection wrapper.

use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, warn};

use crate::config::PgConfig;
use crate::error::PgResult;

/// A single PostgreSQL session shared by the introspector and the
/// migration store. Statements are serialized through a lock so a
/// migration's transaction owns the session while it runs.
pub struct PgConnection {
    client: Mutex<Client>,
    schema: String,
}

impl PgConnection {
    /// Connect, retrying connection failures with exponential backoff.
    pub async fn connect(config: &PgConfig) -> PgResult<Self> {
        let attempts = config.connect_attempts.max(1);
        let mut backoff = config.retry_backoff;
        let mut attempt = 1;

        loop {
            match Self::connect_once(config).await {
                Ok(client) => {
                    debug!(url = %config.redacted_url(), attempt, "Connected to PostgreSQL");
                    return Ok(Self {
                        client: Mutex::new(client),
                        schema: config.schema.clone(),
                    });
                }
                Err(e) if e.is_connection_error() && attempt < attempts => {
                    warn!(error = %e, attempt, "Connection failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect_once(config: &PgConfig) -> PgResult<Client> {
        // Server-side refusals (bad password, unknown database) carry a code and are not retried
        let (client, connection) = config.to_pg_config().connect(NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection closed with error");
            }
        });

        Ok(client)
    }

    /// Database schema the tables live in.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Execute a query and return all rows.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, "Executing query");
        let client = self.client.lock().await;
        Ok(client.query(sql, params).await?)
    }

    /// Execute a batch of statements in a single round-trip.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        debug!(sql = %sql, "Executing batch");
        let client = self.client.lock().await;
        client.batch_execute(sql).await?;
        Ok(())
    }

    /// Exclusive access to the session, for transactions.
    pub async fn lock(&self) -> MutexGuard<'_, Client> {
        self.client.lock().await
    }
}
