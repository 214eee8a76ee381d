//! Named bind parameters.
//!
//! The builder renders `:name` placeholders and keeps the values in a
//! [`ParamMap`]. Postgres only understands positional `$n` parameters, so
//! [`to_positional`] rewrites the SQL right before execution. [`interpolate`]
//! produces the literal form used in logs.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Placeholder name → bound value.
///
/// Binding a name that is already present replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    values: BTreeMap<String, Value>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under `name`, overwriting any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Merge `other` into this map; entries of `other` win on conflicts.
    pub fn merge(&mut self, other: ParamMap) {
        self.values.extend(other.values);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.bind(k, v);
        }
        map
    }
}

impl IntoIterator for ParamMap {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// The bind-parameter name for a column: every character that can not
/// appear in a placeholder name becomes `_`.
///
/// `users.id` binds as `:users_id`, `LOWER(email)` as `:LOWER_email_`.
pub fn bind_key(column: &str) -> String {
    column
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect()
}

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Walk `sql`, calling `replace` for every `:name` placeholder and copying
/// everything else through.
///
/// Text inside single-quoted literals and double-quoted identifiers is left
/// alone, as are `::type` casts.
fn rewrite_placeholders<F>(sql: &str, mut replace: F) -> DbResult<String>
where
    F: FnMut(&str, &mut String) -> DbResult<()>,
{
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '\'' | '"' => {
                out.push(ch);
                for (_, c) in chars.by_ref() {
                    out.push(c);
                    if c == ch {
                        break;
                    }
                }
            }
            ':' => {
                if let Some(&(_, ':')) = chars.peek() {
                    out.push_str("::");
                    chars.next();
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, c)) = chars.peek() {
                    if !is_name_char(c) {
                        break;
                    }
                    end = j + c.len_utf8();
                    chars.next();
                }
                if end == start {
                    out.push(':');
                } else {
                    replace(&sql[start..end], &mut out)?;
                }
            }
            _ => out.push(ch),
        }
    }

    Ok(out)
}

/// Translate `:name` placeholders into `$1, $2, ...`.
///
/// A name used more than once reuses its index. A name missing from `params`
/// is a validation error.
pub fn to_positional(sql: &str, params: &ParamMap) -> DbResult<(String, Vec<Value>)> {
    let mut order: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let rewritten = rewrite_placeholders(sql, |name, out| {
        let idx = match order.iter().position(|n| n == name) {
            Some(pos) => pos + 1,
            None => {
                let value = params.get(name).ok_or_else(|| {
                    DbError::validation(format!("no value bound for placeholder :{name}"))
                })?;
                order.push(name.to_string());
                values.push(value.clone());
                order.len()
            }
        };
        let _ = write!(out, "${idx}");
        Ok(())
    })?;

    Ok((rewritten, values))
}

/// Substitute every `:name` with its literal value, `NULL` when unbound.
///
/// The result is meant for logs and diagnostics, never for execution.
pub fn interpolate(sql: &str, params: &ParamMap) -> String {
    let rendered = rewrite_placeholders(sql, |name, out| {
        match params.get(name) {
            Some(value) => out.push_str(&value.to_inline_sql()),
            None => out.push_str("NULL"),
        }
        Ok(())
    });
    rendered.unwrap_or_else(|_| sql.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParamMap {
        [("name", Value::from("O'Brien")), ("age", Value::from(30))]
            .into_iter()
            .collect()
    }

    #[test]
    fn bind_key_replaces_dots() {
        assert_eq!(bind_key("users.id"), "users_id");
        assert_eq!(bind_key("status"), "status");
    }

    #[test]
    fn bind_key_sanitizes_expressions_and_quoted_names() {
        assert_eq!(bind_key("LOWER(email)"), "LOWER_email_");
        assert_eq!(bind_key("\"Name\""), "_Name_");
        assert_eq!(bind_key("u.\"Created At\""), "u__Created_At_");

        let params: ParamMap = [(bind_key("LOWER(email)"), "a@b.c")].into_iter().collect();
        let (sql, values) = to_positional("WHERE LOWER(email) = :LOWER_email_", &params).unwrap();
        assert_eq!(sql, "WHERE LOWER(email) = $1");
        assert_eq!(values, vec![Value::from("a@b.c")]);
    }

    #[test]
    fn later_binding_overwrites() {
        let mut map = ParamMap::new();
        map.bind("status", "draft");
        map.bind("status", "published");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("status"), Some(&Value::from("published")));
    }

    #[test]
    fn positional_numbers_in_order_of_appearance() {
        let (sql, values) =
            to_positional("SELECT * FROM t WHERE age > :age AND name = :name", &params()).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE age > $1 AND name = $2");
        assert_eq!(values, vec![Value::from(30), Value::from("O'Brien")]);
    }

    #[test]
    fn positional_reuses_index_for_repeated_name() {
        let (sql, values) = to_positional("a = :age OR b = :age", &params()).unwrap();
        assert_eq!(sql, "a = $1 OR b = $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn positional_ignores_casts_and_literals() {
        let (sql, values) =
            to_positional("SELECT ':age', x::text FROM t WHERE n = :name", &params()).unwrap();
        assert_eq!(sql, "SELECT ':age', x::text FROM t WHERE n = $1");
        assert_eq!(values, vec![Value::from("O'Brien")]);
    }

    #[test]
    fn positional_rejects_unbound_names() {
        let err = to_positional("a = :missing", &params()).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn interpolate_inlines_values_and_null_for_unbound() {
        let sql = interpolate("name = :name AND age = :age AND x = :missing", &params());
        assert_eq!(sql, "name = 'O''Brien' AND age = 30 AND x = NULL");
    }

    #[test]
    fn lone_colon_is_kept() {
        assert_eq!(interpolate("a : b", &ParamMap::new()), "a : b");
    }
}
