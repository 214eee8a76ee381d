//! Builder state and the non-WHERE half of the fluent API.

use super::QueryBuilder;
use super::predicate::{ConditionGroup, WhereBuilder};
use crate::value::Value;

/// Everything a SELECT accumulates before it is rendered.
///
/// Cloning a state gives an independent copy; `upsert` relies on this to
/// run one UPDATE per row against the same base query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    /// Table name, prefix already applied.
    pub table: String,
    pub columns: Vec<String>,
    pub distinct: bool,
    /// Fully rendered join fragments, each with its leading space.
    pub joins: Vec<String>,
    pub wheres: ConditionGroup,
    pub having: String,
    pub groups: Vec<String>,
    /// `(column, direction)` in first-seen order.
    pub orders: Vec<(String, String)>,
    pub limit: Option<u64>,
    /// Second half of the legacy `LIMIT n, offset` form.
    pub limit_offset: Option<u64>,
    pub offset: Option<u64>,
}

impl BuilderState {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub(crate) fn push_join(&mut self, kind: &str, table: &str, condition: &str) {
        self.joins.push(format!(" {kind} JOIN {table} ON ({condition})"));
    }

    /// Record an ORDER BY entry; an existing column keeps its position and
    /// takes the new direction.
    pub(crate) fn set_order(&mut self, column: &str, direction: &str) {
        let mut parts = column.split_whitespace();
        let Some(name) = parts.next() else {
            return;
        };
        let direction = parts.next().unwrap_or(direction).to_ascii_uppercase();

        match self.orders.iter_mut().find(|(c, _)| c == name) {
            Some(entry) => entry.1 = direction,
            None => self.orders.push((name.to_string(), direction)),
        }
    }

    pub(crate) fn push_having(&mut self, connective: &str, fragment: String) {
        if !self.having.is_empty() {
            self.having.push(' ');
            self.having.push_str(connective);
            self.having.push(' ');
        }
        self.having.push_str(&fragment);
    }
}

impl<C> QueryBuilder<'_, C> {
    /// Replace the column list.
    pub fn select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.state.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append to the column list.
    pub fn add_select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.state.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append a raw select expression. `{db_prefix}` is replaced with the
    /// configured table prefix.
    pub fn select_raw(mut self, expression: &str) -> Self {
        let expression = expression.replace("{db_prefix}", self.db.prefix());
        self.state.columns.push(expression);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.state.distinct = true;
        self
    }

    /// `INNER JOIN {prefix}table ON (first op second)`.
    pub fn join(mut self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        let condition = format!("{first} {operator} {second}");
        let table = format!("{}{}", self.db.prefix(), table);
        self.state.push_join("INNER", &table, condition.trim_end());
        self
    }

    /// `INNER JOIN {prefix}table ON (condition)`.
    pub fn join_on(mut self, table: &str, condition: &str) -> Self {
        let table = format!("{}{}", self.db.prefix(), table);
        self.state.push_join("INNER", &table, condition.trim_end());
        self
    }

    pub fn left_join(mut self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        let condition = format!("{first} {operator} {second}");
        let table = format!("{}{}", self.db.prefix(), table);
        self.state.push_join("LEFT", &table, condition.trim_end());
        self
    }

    pub fn left_join_on(mut self, table: &str, condition: &str) -> Self {
        let table = format!("{}{}", self.db.prefix(), table);
        self.state.push_join("LEFT", &table, condition.trim_end());
        self
    }

    /// Append `column op value` to HAVING, joined with AND.
    ///
    /// The value is written into the SQL as a literal, not bound.
    pub fn having(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        let fragment = format!("{column} {operator} {}", value.into().to_inline_sql());
        self.state.push_having("AND", fragment);
        self
    }

    pub fn or_having(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        let fragment = format!("{column} {operator} {}", value.into().to_inline_sql());
        self.state.push_having("OR", fragment);
        self
    }

    pub fn group_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.state.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Order by `column` in `direction`.
    ///
    /// `column` may carry its own direction (`"name DESC"`), which wins over
    /// `direction`. Ordering by a column again changes its direction but not
    /// its position.
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.state.set_order(column, direction);
        self
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, "DESC")
    }

    /// Set `LIMIT n`. Negative values are ignored.
    pub fn limit(mut self, n: i64) -> Self {
        if let Ok(n) = u64::try_from(n) {
            self.state.limit = Some(n);
            self.state.limit_offset = None;
        }
        self
    }

    /// Set the two-argument `LIMIT n, offset` form.
    ///
    /// This is the MySQL spelling; PostgreSQL rejects it. Prefer
    /// [`limit`](Self::limit) with [`offset`](Self::offset). A zero offset
    /// falls back to plain `LIMIT n`.
    pub fn limit_offset(mut self, n: i64, offset: i64) -> Self {
        if let Ok(n) = u64::try_from(n) {
            self.state.limit = Some(n);
            self.state.limit_offset = u64::try_from(offset).ok().filter(|o| *o > 0);
        }
        self
    }

    /// Set `OFFSET n`. Negative values are ignored.
    pub fn offset(mut self, n: i64) -> Self {
        if let Ok(n) = u64::try_from(n) {
            self.state.offset = Some(n);
        }
        self
    }
}

impl<C> WhereBuilder for QueryBuilder<'_, C> {
    fn conditions_mut(&mut self) -> &mut ConditionGroup {
        &mut self.state.wheres
    }
}
