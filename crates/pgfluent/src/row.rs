//! Row mapping traits and utilities

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::collections::BTreeMap;
use tokio_postgres::Row;
use tokio_postgres::types::FromSqlOwned;

/// A row as a column name → value mapping.
///
/// Used both for rows read back from the database and for the rows handed to
/// `insert`, `update` and `upsert`. Keys are kept sorted, so the column list
/// derived from a record is stable regardless of how it was built.
pub type Record = BTreeMap<String, Value>;

/// Build a [`Record`] from `column => value` pairs.
///
/// ```ignore
/// let row = pgfluent::record! { "name" => "alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        record
    }};
}

/// Trait for converting a database row into a Rust struct.
///
/// # Example
///
/// ```ignore
/// use pgfluent::{DbResult, FromRow, RowExt};
/// use tokio_postgres::Row;
///
/// struct User {
///     id: i64,
///     username: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> DbResult<Self> {
///         Ok(User {
///             id: row.try_get_column("id")?,
///             username: row.try_get_column("username")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> DbResult<Self>;
}

impl FromRow for Record {
    fn from_row(row: &Row) -> DbResult<Self> {
        let mut record = Record::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value: Value = row
                .try_get(idx)
                .map_err(|e| DbError::decode(column.name(), e.to_string()))?;
            record.insert(column.name().to_string(), value);
        }
        Ok(record)
    }
}

macro_rules! impl_from_row_tuple {
    ($($idx:tt => $t:ident),+) => {
        impl<$($t: FromSqlOwned),+> FromRow for ($($t,)+) {
            fn from_row(row: &Row) -> DbResult<Self> {
                Ok(($(row.try_get_index::<$t>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(0 => A);
impl_from_row_tuple!(0 => A, 1 => B);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C, 3 => D);

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning DbError::Decode on failure
    fn try_get_column<T: FromSqlOwned>(&self, column: &str) -> DbResult<T>;

    /// Try to get a column value by position, returning DbError::Decode on failure
    fn try_get_index<T: FromSqlOwned>(&self, idx: usize) -> DbResult<T>;
}

impl RowExt for Row {
    fn try_get_column<T: FromSqlOwned>(&self, column: &str) -> DbResult<T> {
        self.try_get(column)
            .map_err(|e| DbError::decode(column, e.to_string()))
    }

    fn try_get_index<T: FromSqlOwned>(&self, idx: usize) -> DbResult<T> {
        self.try_get(idx).map_err(|e| {
            let column = self
                .columns()
                .get(idx)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("#{idx}"));
            DbError::decode(column, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Value;

    #[test]
    fn record_macro_sorts_columns() {
        let row = record! { "name" => "alice", "age" => 30, "email" => None::<String> };
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["age", "email", "name"]);
        assert_eq!(row["age"], Value::Int(30));
        assert_eq!(row["email"], Value::Null);
    }

    #[test]
    fn empty_record_macro() {
        let row = record! {};
        assert!(row.is_empty());
    }
}
