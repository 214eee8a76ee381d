use crate::client::GenericClient;
use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};
use crate::log::{QueryLog, QueryLogEntry};
use crate::qb::QueryBuilder;
use tokio_postgres::NoTls;

/// A database handle: one client, its settings and its query log.
///
/// `C` is anything implementing [`GenericClient`](crate::GenericClient), usually a
/// `tokio_postgres::Client` or a `tokio_postgres::Transaction`.
///
/// ```ignore
/// let db = pgfluent::connect(&DatabaseConfig::from_env()?).await?;
/// let users: Vec<Record> = db.table("users").where_eq("active", true).get().await?;
/// ```
#[derive(Debug)]
pub struct Database<C> {
    client: C,
    config: DatabaseConfig,
    log: QueryLog,
}

impl<C> Database<C> {
    /// Wrap an already connected client.
    pub fn new(client: C, config: DatabaseConfig) -> Self {
        let log = QueryLog::new(config.query_log_capacity);
        Self {
            client,
            config,
            log,
        }
    }

    /// Start a query on `{prefix}{name}`.
    pub fn table(&self, name: &str) -> QueryBuilder<'_, C> {
        QueryBuilder::new(self, format!("{}{}", self.config.prefix, name))
    }

    /// Executed statements, oldest first.
    pub fn queries(&self) -> Vec<QueryLogEntry> {
        self.log.snapshot()
    }

    pub fn clear_queries(&self) {
        self.log.clear();
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    pub(crate) fn key_column(&self) -> Option<&str> {
        self.config.key_column.as_deref()
    }

    pub(crate) fn query_log(&self) -> &QueryLog {
        &self.log
    }

    /// Give the client back.
    pub fn into_inner(self) -> C {
        self.client
    }
}

impl<C: GenericClient> Database<C> {
    /// Start a multi-statement batch.
    pub(crate) async fn begin_batch(&self) -> DbResult<()> {
        tracing::debug!(target: "pgfluent.sql", "batch begin");
        self.client.begin().await
    }

    pub(crate) async fn commit_batch(&self, completed: usize) -> DbResult<()> {
        match self.client.commit().await {
            Ok(()) => {
                tracing::debug!(target: "pgfluent.sql", completed, "batch commit");
                Ok(())
            }
            Err(e) => Err(self.abort_batch(completed, e).await),
        }
    }

    /// Roll the batch back and wrap `cause` with the progress made so far.
    pub(crate) async fn abort_batch(&self, completed: usize, cause: DbError) -> DbError {
        if let Err(rollback_err) = self.client.rollback().await {
            tracing::warn!(
                target: "pgfluent.sql",
                error = %rollback_err,
                "batch rollback failed"
            );
        }
        DbError::batch(completed, cause)
    }
}

/// Open a connection described by `config`.
///
/// The connection task is spawned on the current tokio runtime and the
/// configured client encoding is applied before the handle is returned.
pub async fn connect(config: &DatabaseConfig) -> DbResult<Database<tokio_postgres::Client>> {
    let pg = config.to_pg_config()?;
    let (client, connection) = pg
        .connect(NoTls)
        .await
        .map_err(|e| DbError::Connection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(target: "pgfluent.sql", error = %e, "connection closed with error");
        }
    });

    if !config.client_encoding.is_empty() {
        let set_encoding = format!(
            "SET client_encoding = '{}'",
            config.client_encoding.replace('\'', "''")
        );
        client
            .batch_execute(&set_encoding)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
    }

    Ok(Database::new(client, config.clone()))
}
