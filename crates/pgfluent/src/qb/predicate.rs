//! WHERE predicates and the AND/OR list that holds them.
//!
//! Predicates keep the SQL fragment shape and the name of their placeholder;
//! the values themselves live in the owning [`ConditionGroup`]'s
//! [`ParamMap`]. Nested groups merge their parameters into the parent when
//! they are attached, so a whole WHERE tree shares one parameter namespace.

use crate::params::{ParamMap, bind_key};
use crate::value::Value;

/// How a predicate is joined to the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// Right-hand side of a basic predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Named placeholder `:key`; the value is in the parameter map.
    Bound(String),
    /// Literal list rendered inline as `(v1, v2, ...)`.
    Inline(Vec<Value>),
    /// No operand (`IS NULL`, `IS NOT NULL`).
    Empty,
}

/// One WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Basic {
        column: String,
        operator: String,
        value: Operand,
    },
    /// Caller-supplied SQL, emitted verbatim.
    Raw(String),
    /// Parenthesised sub-list.
    Group(ConditionGroup),
}

impl Predicate {
    pub fn render(&self) -> String {
        match self {
            Predicate::Basic {
                column,
                operator,
                value,
            } => match value {
                Operand::Bound(key) => format!("{column} {operator} :{key}"),
                Operand::Inline(values) => {
                    let list: Vec<String> = values.iter().map(Value::to_inline_sql).collect();
                    format!("{column} {operator} ({})", list.join(", "))
                }
                Operand::Empty => format!("{column} {operator}"),
            },
            Predicate::Raw(sql) => sql.clone(),
            Predicate::Group(group) => {
                let inner = group.render();
                if inner.is_empty() {
                    inner
                } else {
                    format!("({inner})")
                }
            }
        }
    }

    /// Whether the predicate contributes no SQL at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Basic { .. } => false,
            Predicate::Raw(sql) => sql.is_empty(),
            Predicate::Group(group) => group.is_empty(),
        }
    }
}

/// An ordered list of predicates, each with its connective, plus the
/// parameters they bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionGroup {
    predicates: Vec<(Connective, Predicate)>,
    params: ParamMap,
}

impl ConditionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when rendering would produce no SQL.
    pub fn is_empty(&self) -> bool {
        self.predicates.iter().all(|(_, p)| p.is_empty())
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn predicates(&self) -> impl Iterator<Item = (Connective, &Predicate)> {
        self.predicates.iter().map(|(c, p)| (*c, p))
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn push(&mut self, connective: Connective, predicate: Predicate) {
        if let Predicate::Group(group) = &predicate {
            self.params.merge(group.params.clone());
        }
        self.predicates.push((connective, predicate));
    }

    /// Push `column op :key`, binding `value` under the column's bind key.
    pub fn push_bound(
        &mut self,
        connective: Connective,
        column: &str,
        operator: &str,
        value: Value,
    ) {
        let key = bind_key(column);
        self.params.bind(key.clone(), value);
        self.push(
            connective,
            Predicate::Basic {
                column: column.to_string(),
                operator: operator.to_string(),
                value: Operand::Bound(key),
            },
        );
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.bind(name, value);
    }

    /// Join the predicates with their connectives.
    ///
    /// Empty fragments are skipped without consuming the leading position,
    /// so the first emitted fragment never carries a connective.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (connective, predicate) in &self.predicates {
            let fragment = predicate.render();
            if fragment.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
                out.push_str(connective.as_sql());
                out.push(' ');
            }
            out.push_str(&fragment);
        }
        out
    }

    /// ` WHERE ...`, or an empty string when nothing renders.
    pub fn where_clause(&self) -> String {
        let conditions = self.render();
        if conditions.is_empty() {
            conditions
        } else {
            format!(" WHERE {conditions}")
        }
    }
}

/// The WHERE-building vocabulary, shared by [`QueryBuilder`](crate::QueryBuilder)
/// and the nested groups passed to [`WhereBuilder::where_group`].
///
/// Every method consumes and returns the builder.
pub trait WhereBuilder: Sized {
    /// The list new predicates are appended to.
    fn conditions_mut(&mut self) -> &mut ConditionGroup;

    /// `column op :column`, joined with AND.
    fn filter(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.conditions_mut()
            .push_bound(Connective::And, column, operator, value.into());
        self
    }

    /// `column op :column`, joined with OR.
    fn or_filter(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.conditions_mut()
            .push_bound(Connective::Or, column, operator, value.into());
        self
    }

    /// Same as `filter(column, "=", value)`.
    fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, "=", value)
    }

    fn or_where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.or_filter(column, "=", value)
    }

    /// A constant condition such as `1=1`, emitted as written.
    fn where_literal(self, condition: &str) -> Self {
        self.where_raw(condition, ParamMap::new())
    }

    fn or_where_literal(self, condition: &str) -> Self {
        self.or_where_raw(condition, ParamMap::new())
    }

    /// One `where_eq` per `(column, value)` pair.
    fn where_all<K, V, I>(self, pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(self, |qb, (column, value)| qb.where_eq(column.as_ref(), value))
    }

    /// `column IN (v1, v2, ...)` with the values inlined, not bound.
    ///
    /// An empty list renders `1=0`.
    fn where_in<V, I>(mut self, column: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        push_in(self.conditions_mut(), Connective::And, column, values, false);
        self
    }

    fn or_where_in<V, I>(mut self, column: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        push_in(self.conditions_mut(), Connective::Or, column, values, false);
        self
    }

    /// `column NOT IN (...)`. An empty list renders `1=1`.
    fn where_not_in<V, I>(mut self, column: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        push_in(self.conditions_mut(), Connective::And, column, values, true);
        self
    }

    fn or_where_not_in<V, I>(mut self, column: &str, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        push_in(self.conditions_mut(), Connective::Or, column, values, true);
        self
    }

    fn where_null(mut self, column: &str) -> Self {
        push_null(self.conditions_mut(), Connective::And, column, "IS NULL");
        self
    }

    fn or_where_null(mut self, column: &str) -> Self {
        push_null(self.conditions_mut(), Connective::Or, column, "IS NULL");
        self
    }

    fn where_not_null(mut self, column: &str) -> Self {
        push_null(self.conditions_mut(), Connective::And, column, "IS NOT NULL");
        self
    }

    fn or_where_not_null(mut self, column: &str) -> Self {
        push_null(self.conditions_mut(), Connective::Or, column, "IS NOT NULL");
        self
    }

    /// Raw SQL with its own `:name` bindings.
    ///
    /// Binding names are used as given. An empty `sql` is kept but never
    /// rendered.
    fn where_raw<K, V, I>(mut self, sql: &str, bindings: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        push_raw(self.conditions_mut(), Connective::And, sql, bindings);
        self
    }

    fn or_where_raw<K, V, I>(mut self, sql: &str, bindings: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        push_raw(self.conditions_mut(), Connective::Or, sql, bindings);
        self
    }

    /// A parenthesised group built by `build`, joined with AND.
    ///
    /// ```ignore
    /// db.table("posts")
    ///     .where_eq("published", true)
    ///     .where_group(|g| g.where_eq("author", 1).or_where_eq("editor", 1));
    /// // ... WHERE published = :published AND (author = :author OR editor = :editor)
    /// ```
    fn where_group(mut self, build: impl FnOnce(ConditionGroup) -> ConditionGroup) -> Self {
        let group = build(ConditionGroup::new());
        self.conditions_mut()
            .push(Connective::And, Predicate::Group(group));
        self
    }

    fn or_where_group(mut self, build: impl FnOnce(ConditionGroup) -> ConditionGroup) -> Self {
        let group = build(ConditionGroup::new());
        self.conditions_mut()
            .push(Connective::Or, Predicate::Group(group));
        self
    }
}

impl WhereBuilder for ConditionGroup {
    fn conditions_mut(&mut self) -> &mut ConditionGroup {
        self
    }
}

fn push_in<V, I>(group: &mut ConditionGroup, connective: Connective, column: &str, values: I, negated: bool)
where
    V: Into<Value>,
    I: IntoIterator<Item = V>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    if values.is_empty() {
        let always = if negated { "1=1" } else { "1=0" };
        group.push(connective, Predicate::Raw(always.to_string()));
        return;
    }
    group.push(
        connective,
        Predicate::Basic {
            column: column.to_string(),
            operator: if negated { "NOT IN" } else { "IN" }.to_string(),
            value: Operand::Inline(values),
        },
    );
}

fn push_null(group: &mut ConditionGroup, connective: Connective, column: &str, operator: &str) {
    group.push(
        connective,
        Predicate::Basic {
            column: column.to_string(),
            operator: operator.to_string(),
            value: Operand::Empty,
        },
    );
}

fn push_raw<K, V, I>(group: &mut ConditionGroup, connective: Connective, sql: &str, bindings: I)
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    for (name, value) in bindings {
        group.bind(name, value);
    }
    group.push(connective, Predicate::Raw(sql.to_string()));
}
