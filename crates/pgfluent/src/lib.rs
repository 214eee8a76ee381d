//! # pgfluent
//!
//! A fluent SQL query builder for PostgreSQL.
//!
//! ## Features
//!
//! - **Chainable builder**: columns, joins, predicates, grouping, ordering and
//!   limits accumulate on a [`QueryBuilder`] and render to one statement
//! - **Named parameters**: values are bound as `:name` placeholders and sent
//!   to the server as positional parameters
//! - **Convenience verbs**: `find`, `first`, `value`, `pluck`, `count`,
//!   `insert`, `update`, `upsert`, `increment`, `delete`
//! - **Atomic batches**: multi-row inserts and upserts run in one transaction
//!   and report how far they got when they fail
//! - **Query log**: the last statements, with values inlined, for debugging
//!
//! ## Example
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! let db = pgfluent::connect(&DatabaseConfig::from_env()?).await?;
//!
//! let active: Vec<Record> = db
//!     .table("members")
//!     .select(["id", "name"])
//!     .where_eq("is_activated", true)
//!     .order_by("name", "ASC")
//!     .get()
//!     .await?;
//!
//! let total = db.table("members").count("*").await?;
//!
//! db.table("members")
//!     .where_eq("id", 1)
//!     .update(record! { "last_login" => chrono::Utc::now() })
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod log;
pub mod params;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod statement;
pub mod value;

pub use client::GenericClient;
pub use config::DatabaseConfig;
pub use database::{Database, connect};
pub use error::{DbError, DbResult};
pub use log::{QueryLog, QueryLogEntry, QueryType};
pub use params::ParamMap;
pub use qb::{BuilderState, ConditionGroup, Connective, QueryBuilder, WhereBuilder};
pub use row::{FromRow, Record, RowExt};
pub use statement::Statement;
pub use value::Value;
