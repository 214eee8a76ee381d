//! Terminal operations.

use super::QueryBuilder;
use super::predicate::WhereBuilder;
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::params::{ParamMap, bind_key};
use crate::row::{FromRow, Record, RowExt};
use crate::statement::Statement;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use tokio_postgres::Row;
use tokio_postgres::types::FromSqlOwned;

impl<C: GenericClient> QueryBuilder<'_, C> {
    /// Run the SELECT and map every row.
    pub async fn get<T: FromRow>(self) -> DbResult<Vec<T>> {
        self.fetch_rows("get").await
    }

    /// Run the SELECT and map the first row, if any.
    pub async fn get_one<T: FromRow>(self) -> DbResult<Option<T>> {
        self.fetch_row("get_one").await
    }

    /// The row whose key column equals `id`.
    ///
    /// Fails with a validation error when no key column is configured.
    pub async fn find<T: FromRow>(self, id: impl Into<Value>) -> DbResult<Option<T>> {
        let db = self.db;
        let key = db
            .key_column()
            .ok_or_else(|| DbError::validation("find requires a key column"))?;
        self.where_eq(key, id).limit(1).fetch_row("find").await
    }

    /// The first row where `column` equals `id`.
    pub async fn find_by<T: FromRow>(self, column: &str, id: impl Into<Value>) -> DbResult<Option<T>> {
        self.where_eq(column, id).limit(1).fetch_row("find").await
    }

    /// The first row of the query, with `LIMIT 1` applied.
    pub async fn first<T: FromRow>(self) -> DbResult<Option<T>> {
        self.limit(1).fetch_row("first").await
    }

    /// A single column of the first row.
    ///
    /// `None` when no row matched. Use `Option<T>` as `T` when the column
    /// itself may be NULL.
    pub async fn value<T: FromSqlOwned>(self, column: &str) -> DbResult<Option<T>> {
        let qb = self.select([column]).limit(1);
        let stmt = qb.statement(qb.state.to_sql(), qb.state.params().clone(), "value");
        match qb.db.fetch_opt(&stmt).await? {
            Some(row) => row.try_get_index::<T>(0).map(Some),
            None => Ok(None),
        }
    }

    /// Every value of `column` in the table.
    ///
    /// Runs `SELECT column FROM table` directly: predicates, joins and limits
    /// accumulated on the builder are not applied.
    pub async fn pluck<T: FromSqlOwned>(self, column: &str) -> DbResult<Vec<T>> {
        let sql = format!("SELECT {column} FROM {}", self.state.table);
        let rows = self.fetch_direct(sql, "pluck").await?;
        rows.iter().map(|row| row.try_get_index::<T>(0)).collect()
    }

    /// `key → column` for every row of the table. Later rows win on
    /// duplicate keys.
    ///
    /// Like [`pluck`](Self::pluck), ignores accumulated predicates.
    pub async fn pluck_keyed<K, V>(self, column: &str, key: &str) -> DbResult<BTreeMap<K, V>>
    where
        K: FromSqlOwned + Ord,
        V: FromSqlOwned,
    {
        let sql = format!("SELECT {key}, {column} FROM {}", self.state.table);
        let rows = self.fetch_direct(sql, "pluck").await?;
        let mut out = BTreeMap::new();
        for row in &rows {
            out.insert(row.try_get_index::<K>(0)?, row.try_get_index::<V>(1)?);
        }
        Ok(out)
    }

    /// `COUNT(column)` over the whole table. Accumulated predicates are not
    /// applied.
    pub async fn count(self, column: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT({column}) FROM {}", self.state.table);
        self.aggregate::<i64>(sql, "count").await.map(|n| n.unwrap_or(0))
    }

    /// `MIN(column)` over the whole table; `None` for an empty table.
    pub async fn min<T: FromSqlOwned>(self, column: &str) -> DbResult<Option<T>> {
        let sql = format!("SELECT MIN({column}) FROM {}", self.state.table);
        self.aggregate(sql, "min").await
    }

    /// `MAX(column)` over the whole table; `None` for an empty table.
    pub async fn max<T: FromSqlOwned>(self, column: &str) -> DbResult<Option<T>> {
        let sql = format!("SELECT MAX({column}) FROM {}", self.state.table);
        self.aggregate(sql, "max").await
    }

    /// Insert one row and return its key, if a key column is configured.
    pub async fn insert(self, record: Record) -> DbResult<Option<Value>> {
        let keys = self.insert_many([record]).await?;
        Ok(keys.into_iter().next())
    }

    /// Insert rows in one transaction and return their keys in order.
    ///
    /// All rows share one column list, the sorted union of their columns,
    /// and every row must supply every column. When a row fails the whole
    /// batch is rolled back and [`DbError::Batch`] reports how many rows had
    /// gone through.
    pub async fn insert_many(self, records: impl IntoIterator<Item = Record>) -> DbResult<Vec<Value>> {
        let rows: Vec<Record> = records.into_iter().collect();
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let sql = self.insert_sql(&rows)?;
        let returning = self.db.key_column().is_some();
        let db = self.db;
        let total = rows.len();

        db.begin_batch().await?;
        let mut keys = Vec::with_capacity(total);
        for (completed, row) in rows.into_iter().enumerate() {
            let params: ParamMap = row.into_iter().map(|(k, v)| (bind_key(&k), v)).collect();
            let stmt = self.statement(sql.clone(), params, "insert");

            let result = if returning {
                match db.fetch_opt(&stmt).await {
                    Ok(Some(row)) => row.try_get_index::<Value>(0).map(Some),
                    Ok(None) => Ok(None),
                    Err(e) => Err(e),
                }
            } else {
                db.execute(&stmt).await.map(|_| None)
            };

            match result {
                Ok(Some(key)) => keys.push(key),
                Ok(None) => {}
                Err(e) => return Err(db.abort_batch(completed, e).await),
            }
        }
        db.commit_batch(total).await?;
        Ok(keys)
    }

    /// `UPDATE table SET ... WHERE ...` with the accumulated predicates.
    /// Returns the number of affected rows.
    pub async fn update(self, values: Record) -> DbResult<u64> {
        if values.is_empty() {
            return Err(DbError::validation("update requires at least one column"));
        }
        let mut params = self.state.params().clone();
        let mut assignments = Vec::with_capacity(values.len());
        for (column, value) in values {
            assignments.push(bind_set(&mut params, &column, value)?);
        }

        let sql = format!(
            "UPDATE {} SET {}{}",
            self.state.table,
            assignments.join(", "),
            self.state.prepared_where()
        );
        let stmt = self.statement(sql, params, "update");
        self.db.execute(&stmt).await
    }

    /// Update rows matched by their key fields, one UPDATE per record, in a
    /// single transaction.
    ///
    /// Each record is split into key fields (the columns named in `keys`)
    /// and update fields (everything else, narrowed to `update` when given).
    /// `Some(&[])` as `update` inserts the records instead and returns how
    /// many were inserted. Otherwise returns the total number of affected
    /// rows. Every record must carry every key column.
    pub async fn upsert(
        self,
        records: impl IntoIterator<Item = Record>,
        keys: &[&str],
        update: Option<&[&str]>,
    ) -> DbResult<u64> {
        let rows: Vec<Record> = records.into_iter().collect();
        if rows.is_empty() {
            return Ok(0);
        }
        if update.is_some_and(|cols| cols.is_empty()) {
            let total = rows.len();
            self.insert_many(rows).await?;
            return Ok(total as u64);
        }
        if keys.is_empty() {
            return Err(DbError::validation("upsert requires at least one key column"));
        }

        let mut plans = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if let Some(missing) = keys.iter().find(|key| !row.contains_key(**key)) {
                return Err(DbError::validation(format!(
                    "upsert row {idx} is missing key column {missing}"
                )));
            }
            let (key_fields, fields): (Record, Record) =
                row.into_iter().partition(|(column, _)| keys.contains(&column.as_str()));
            let fields: Record = match update {
                Some(cols) => fields
                    .into_iter()
                    .filter(|(column, _)| cols.contains(&column.as_str()))
                    .collect(),
                None => fields,
            };
            if fields.is_empty() {
                return Err(DbError::validation("upsert row has no columns to update"));
            }
            plans.push((key_fields, fields));
        }

        let db = self.db;
        let total = plans.len();
        db.begin_batch().await?;
        let mut affected = 0;
        for (completed, (key_fields, fields)) in plans.into_iter().enumerate() {
            match self.clone().where_all(key_fields).update(fields).await {
                Ok(n) => affected += n,
                Err(e) => return Err(db.abort_batch(completed, e).await),
            }
        }
        db.commit_batch(total).await?;
        Ok(affected)
    }

    /// Add `amount` to `column`, clamping rows whose current value is
    /// negative to zero. `extra` columns are set in the same statement.
    pub async fn increment(self, column: &str, amount: i64, extra: Record) -> DbResult<u64> {
        let mut params = self.state.params().clone();
        let mut assignments =
            vec![format!("{column} = CASE WHEN {column} >= 0 THEN {column} + {amount} ELSE 0 END")];
        for (name, value) in extra {
            assignments.push(bind_set(&mut params, &name, value)?);
        }

        let sql = format!(
            "UPDATE {} SET {}{}",
            self.state.table,
            assignments.join(", "),
            self.state.prepared_where()
        );
        let stmt = self.statement(sql, params, "increment");
        self.db.execute(&stmt).await
    }

    /// [`increment`](Self::increment) with `amount` negated.
    pub async fn decrement(self, column: &str, amount: i64, extra: Record) -> DbResult<u64> {
        self.increment(column, amount.saturating_neg(), extra).await
    }

    /// `DELETE FROM table WHERE ...`; returns the number of deleted rows.
    pub async fn delete(self) -> DbResult<u64> {
        let sql = format!("DELETE FROM {}{}", self.state.table, self.state.prepared_where());
        let stmt = self.statement(sql, self.state.params().clone(), "delete");
        self.db.execute(&stmt).await
    }

    async fn fetch_rows<T: FromRow>(self, tag: &'static str) -> DbResult<Vec<T>> {
        let stmt = self.statement(self.state.to_sql(), self.state.params().clone(), tag);
        let rows = self.db.fetch_all(&stmt).await?;
        rows.iter().map(T::from_row).collect()
    }

    async fn fetch_row<T: FromRow>(self, tag: &'static str) -> DbResult<Option<T>> {
        let stmt = self.statement(self.state.to_sql(), self.state.params().clone(), tag);
        let row = self.db.fetch_opt(&stmt).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    async fn fetch_direct(&self, sql: String, tag: &'static str) -> DbResult<Vec<Row>> {
        let stmt: Statement = self.statement(sql, ParamMap::new(), tag);
        self.db.fetch_all(&stmt).await
    }

    async fn aggregate<T: FromSqlOwned>(self, sql: String, tag: &'static str) -> DbResult<Option<T>> {
        let stmt = self.statement(sql, ParamMap::new(), tag);
        match self.db.fetch_opt(&stmt).await? {
            Some(row) => row.try_get_index::<Option<T>>(0),
            None => Ok(None),
        }
    }

    /// `INSERT INTO table (a, b) VALUES (:a, :b)`, plus `RETURNING key`.
    fn insert_sql(&self, rows: &[Record]) -> DbResult<String> {
        let columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();

        if let Some(idx) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(DbError::validation(format!(
                "insert row {idx} does not set every column ({})",
                columns.iter().copied().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.state.table)
        } else {
            let names: Vec<&str> = columns.iter().copied().collect();
            let placeholders: Vec<String> =
                columns.iter().map(|c| format!(":{}", bind_key(c))).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.state.table,
                names.join(", "),
                placeholders.join(", ")
            )
        };
        if let Some(key) = self.db.key_column() {
            sql.push_str(" RETURNING ");
            sql.push_str(key);
        }
        Ok(sql)
    }
}

/// `column = :set_column`, binding `value` next to the WHERE parameters.
///
/// A SET key that is already bound (a WHERE column named `set_x`, or a raw
/// binding with that name) is rejected rather than overwritten.
fn bind_set(params: &mut ParamMap, column: &str, value: Value) -> DbResult<String> {
    let key = format!("set_{}", bind_key(column));
    if params.contains(&key) {
        return Err(DbError::validation(format!(
            "SET placeholder :{key} for column {column} is already bound"
        )));
    }
    params.bind(key.clone(), value);
    Ok(format!("{column} = :{key}"))
}
