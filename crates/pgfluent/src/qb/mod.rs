//! Fluent query builder.
//!
//! A [`QueryBuilder`] is created by [`Database::table`] and accumulates
//! columns, joins, predicates, grouping, ordering and limits through chained
//! calls. Terminal operations (`get`, `first`, `update`, `delete`, ...) take
//! the builder by value, render it and run it on the database's client.
//!
//! # Usage
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! let posts: Vec<Record> = db
//!     .table("posts")
//!     .select(["id", "title"])
//!     .where_eq("status", "published")
//!     .filter("views", ">", 100)
//!     .where_in("category_id", [1, 2, 3])
//!     .order_by("created_at DESC", "ASC")
//!     .limit(20)
//!     .get()
//!     .await?;
//!
//! let id = db
//!     .table("posts")
//!     .insert(record! { "title" => "Hello", "status" => "draft" })
//!     .await?;
//!
//! db.table("posts").where_eq("id", 7).increment("views", 1, Record::new()).await?;
//! ```

mod ops;
mod predicate;
mod render;
mod state;

pub use predicate::{ConditionGroup, Connective, Operand, Predicate, WhereBuilder};
pub use state::BuilderState;

use crate::database::Database;
use crate::params::ParamMap;
use crate::statement::Statement;

/// Query builder bound to one table of a [`Database`].
///
/// Single use: every terminal operation consumes it.
#[derive(Debug)]
pub struct QueryBuilder<'a, C> {
    db: &'a Database<C>,
    state: BuilderState,
}

impl<C> Clone for QueryBuilder<'_, C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db,
            state: self.state.clone(),
        }
    }
}

impl<'a, C> QueryBuilder<'a, C> {
    pub(crate) fn new(db: &'a Database<C>, table: String) -> Self {
        Self {
            db,
            state: BuilderState::new(table),
        }
    }

    /// The accumulated state.
    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    /// The SELECT this builder would run.
    pub fn to_sql(&self) -> String {
        self.state.to_sql()
    }

    /// Parameters bound so far.
    pub fn params(&self) -> &ParamMap {
        self.state.params()
    }

    pub fn build(&self) -> (String, ParamMap) {
        self.state.build()
    }

    /// The SELECT as an executable [`Statement`].
    pub fn to_statement(&self) -> Statement {
        self.statement(self.state.to_sql(), self.state.params().clone(), "get")
    }

    fn statement(&self, sql: String, params: ParamMap, tag: &'static str) -> Statement {
        Statement::new(sql, params)
            .with_tag(tag)
            .with_table(self.state.table.clone())
    }
}
