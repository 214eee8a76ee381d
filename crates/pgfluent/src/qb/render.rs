//! SELECT rendering.
//!
//! Each `prepared_*` method renders one clause and returns an empty string
//! when that clause is unset, so the full statement is plain concatenation
//! in a fixed order.

use super::state::BuilderState;
use crate::params::ParamMap;

impl BuilderState {
    pub fn prepared_distinct(&self) -> &'static str {
        if self.distinct { "DISTINCT " } else { "" }
    }

    /// The column list, `*` when nothing was selected.
    pub fn prepared_columns(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        }
    }

    pub fn prepared_joins(&self) -> String {
        self.joins.concat()
    }

    pub fn prepared_where(&self) -> String {
        self.wheres.where_clause()
    }

    pub fn prepared_having(&self) -> String {
        if self.having.is_empty() {
            String::new()
        } else {
            format!(" HAVING {}", self.having)
        }
    }

    pub fn prepared_group_by(&self) -> String {
        if self.groups.is_empty() {
            String::new()
        } else {
            format!(" GROUP BY {}", self.groups.join(", "))
        }
    }

    pub fn prepared_order_by(&self) -> String {
        if self.orders.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .orders
            .iter()
            .map(|(column, direction)| format!("{column} {direction}"))
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    }

    pub fn prepared_limit(&self) -> String {
        match (self.limit, self.limit_offset) {
            (Some(n), Some(offset)) => format!(" LIMIT {n}, {offset}"),
            (Some(n), None) => format!(" LIMIT {n}"),
            (None, _) => String::new(),
        }
    }

    pub fn prepared_offset(&self) -> String {
        match self.offset {
            Some(n) => format!(" OFFSET {n}"),
            None => String::new(),
        }
    }

    /// The full SELECT statement.
    pub fn to_sql(&self) -> String {
        format!(
            "SELECT {}{} FROM {}{}{}{}{}{}{}{}",
            self.prepared_distinct(),
            self.prepared_columns(),
            self.table,
            self.prepared_joins(),
            self.prepared_where(),
            self.prepared_having(),
            self.prepared_group_by(),
            self.prepared_order_by(),
            self.prepared_limit(),
            self.prepared_offset(),
        )
    }

    /// Parameters bound by the WHERE clause.
    pub fn params(&self) -> &ParamMap {
        self.wheres.params()
    }

    /// SQL and parameters together.
    pub fn build(&self) -> (String, ParamMap) {
        (self.to_sql(), self.params().clone())
    }
}
