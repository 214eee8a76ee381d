//! Convenient imports for typical `pgfluent` usage.
//!
//! ```ignore
//! use pgfluent::prelude::*;
//! ```

pub use crate::record;
pub use crate::{
    Database, DatabaseConfig, DbError, DbResult, FromRow, GenericClient, ParamMap, QueryBuilder,
    Record, RowExt, Value, WhereBuilder,
};
