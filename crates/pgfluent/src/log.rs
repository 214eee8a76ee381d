//! In-memory query log.
//!
//! Every statement a [`Database`](crate::Database) executes is appended here.
//! The log is a fixed-size ring, so long-running processes keep only the
//! most recent statements.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Transaction control (BEGIN, COMMIT, SAVEPOINT, ...)
    Transaction,
    /// Other SQL (e.g., DDL, SET)
    Other,
}

impl QueryType {
    /// Detect query type from the leading keyword of a SQL string.
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or("");

        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            "BEGIN" | "COMMIT" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => QueryType::Transaction,
            _ => QueryType::Other,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Select => write!(f, "SELECT"),
            QueryType::Insert => write!(f, "INSERT"),
            QueryType::Update => write!(f, "UPDATE"),
            QueryType::Delete => write!(f, "DELETE"),
            QueryType::Transaction => write!(f, "TRANSACTION"),
            QueryType::Other => write!(f, "OTHER"),
        }
    }
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// The statement with every placeholder replaced by its literal value.
    pub raw_sql: String,
    /// The statement as sent, with `:name` placeholders.
    pub sql: String,
    pub query_type: QueryType,
    /// Operation that issued the statement (`get`, `insert`, `count`, ...).
    pub tag: String,
    /// Error message when the statement failed.
    pub error: Option<String>,
}

/// Bounded ring of [`QueryLogEntry`] values.
#[derive(Debug)]
pub struct QueryLog {
    capacity: usize,
    entries: Mutex<VecDeque<QueryLogEntry>>,
}

impl QueryLog {
    /// Create a log keeping at most `capacity` entries. `0` keeps nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn record(&self, entry: QueryLogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Oldest-first copy of the current entries.
    pub fn snapshot(&self) -> Vec<QueryLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
