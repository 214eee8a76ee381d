//! Generic client trait for unified database access.

use crate::error::{DbError, DbResult};
use std::future::Future;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Savepoint used when a batch runs on a client that is already a transaction.
const BATCH_SAVEPOINT: &str = "pgfluent_batch";

/// A trait that unifies database clients and transactions.
///
/// A [`Database`](crate::Database) is generic over this trait, so the same
/// builder code runs on a plain connection or inside a caller-owned
/// transaction.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    ///
    /// Extra rows are ignored.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = DbResult<u64>> + Send;

    /// Run one or more parameterless statements.
    fn batch_execute(&self, sql: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Open the unit of work used by multi-row writes.
    fn begin(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.batch_execute("BEGIN")
    }

    /// Make the work since [`GenericClient::begin`] permanent.
    fn commit(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.batch_execute("COMMIT")
    }

    /// Discard the work since [`GenericClient::begin`].
    fn rollback(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.batch_execute("ROLLBACK")
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tokio_postgres::Client::batch_execute(self, sql)
            .await
            .map_err(DbError::from_db_error)
    }
}

/// Inside a transaction, batches nest as savepoints so a failed batch only
/// undoes its own rows.
impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tokio_postgres::Transaction::batch_execute(self, sql)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn begin(&self) -> DbResult<()> {
        GenericClient::batch_execute(self, &format!("SAVEPOINT {BATCH_SAVEPOINT}")).await
    }

    async fn commit(&self) -> DbResult<()> {
        GenericClient::batch_execute(self, &format!("RELEASE SAVEPOINT {BATCH_SAVEPOINT}")).await
    }

    async fn rollback(&self) -> DbResult<()> {
        GenericClient::batch_execute(self, &format!("ROLLBACK TO SAVEPOINT {BATCH_SAVEPOINT}"))
            .await
    }
}
