//! Rendered statements and the execution wrapper.
//!
//! A [`Statement`] is SQL with `:name` placeholders plus the values bound to
//! them. Executing one goes through [`Database`], which translates the
//! placeholders to `$n`, runs the statement, appends it to the query log and
//! reports failures through `tracing` with the values inlined.

use crate::client::GenericClient;
use crate::database::Database;
use crate::error::DbResult;
use crate::log::{QueryLogEntry, QueryType};
use crate::params::{self, ParamMap};
use crate::value::Value;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// SQL text with named placeholders and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: ParamMap,
    /// Operation that produced the statement, carried into logs.
    pub tag: &'static str,
    /// Target table, if any, carried into logs.
    pub table: Option<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: ParamMap) -> Self {
        Self {
            sql: sql.into(),
            params,
            tag: "raw",
            table: None,
        }
    }

    pub fn with_tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// The statement with every placeholder replaced by its literal value.
    ///
    /// Unbound placeholders render as `NULL`. Only for diagnostics.
    pub fn debug_sql(&self) -> String {
        params::interpolate(&self.sql, &self.params)
    }

    pub fn query_type(&self) -> QueryType {
        QueryType::from_sql(&self.sql)
    }
}

impl<C: GenericClient> Database<C> {
    /// Run a statement and return every row.
    pub async fn fetch_all(&self, stmt: &Statement) -> DbResult<Vec<Row>> {
        let (sql, values) = self.prepare(stmt)?;
        let refs = param_refs(&values);
        let result = self.client().query(&sql, &refs).await;
        self.finish(stmt, values.len(), result)
    }

    /// Run a statement and return the first row, if any.
    pub async fn fetch_opt(&self, stmt: &Statement) -> DbResult<Option<Row>> {
        let (sql, values) = self.prepare(stmt)?;
        let refs = param_refs(&values);
        let result = self.client().query_opt(&sql, &refs).await;
        self.finish(stmt, values.len(), result)
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, stmt: &Statement) -> DbResult<u64> {
        let (sql, values) = self.prepare(stmt)?;
        let refs = param_refs(&values);
        let result = self.client().execute(&sql, &refs).await;
        self.finish(stmt, values.len(), result)
    }

    fn prepare(&self, stmt: &Statement) -> DbResult<(String, Vec<Value>)> {
        params::to_positional(&stmt.sql, &stmt.params).inspect_err(|e| {
            self.record(stmt, Some(e.to_string()));
        })
    }

    fn finish<T>(&self, stmt: &Statement, param_count: usize, result: DbResult<T>) -> DbResult<T> {
        match &result {
            Ok(_) => {
                tracing::debug!(
                    target: "pgfluent.sql",
                    query_type = %stmt.query_type(),
                    tag = stmt.tag,
                    param_count,
                    sql = %stmt.sql,
                );
                self.record(stmt, None);
            }
            Err(e) => {
                let raw_sql = stmt.debug_sql();
                tracing::error!(
                    target: "pgfluent.sql",
                    tag = stmt.tag,
                    table = stmt.table.as_deref().unwrap_or("-"),
                    sql = %raw_sql,
                    error = %e,
                    "statement failed"
                );
                self.record(stmt, Some(e.to_string()));
            }
        }
        result
    }

    fn record(&self, stmt: &Statement, error: Option<String>) {
        if self.query_log().capacity() == 0 {
            return;
        }
        self.query_log().record(QueryLogEntry {
            raw_sql: stmt.debug_sql(),
            sql: stmt.sql.clone(),
            query_type: stmt.query_type(),
            tag: stmt.tag.to_string(),
            error,
        });
    }
}

fn param_refs(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_sql_inlines_values() {
        let mut params = ParamMap::new();
        params.bind("email", "a'b@example.com");
        params.bind("id", 7);
        let stmt = Statement::new("UPDATE users SET email = :email WHERE id = :id", params)
            .with_tag("update")
            .with_table("users");

        assert_eq!(
            stmt.debug_sql(),
            "UPDATE users SET email = 'a''b@example.com' WHERE id = 7"
        );
        assert_eq!(stmt.query_type(), QueryType::Update);
        assert_eq!(stmt.table.as_deref(), Some("users"));
    }

    #[test]
    fn debug_sql_renders_unbound_as_null() {
        let stmt = Statement::new("SELECT * FROM t WHERE a = :a", ParamMap::new());
        assert_eq!(stmt.debug_sql(), "SELECT * FROM t WHERE a = NULL");
        assert_eq!(stmt.tag, "raw");
    }
}
