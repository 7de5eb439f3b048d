//! Backing graph store abstraction.
//!
//! Every call opens its own [`GraphSession`]; sessions are never shared across
//! concurrent calls. Statements and parameters always travel separately so
//! caller values are bound by the store, never spliced into query text.

use async_trait::async_trait;
use serde_json::{Map, Value};

mod memory;
mod neo4j;

pub use memory::{MemoryGraphStore, RecordedCall};
pub use neo4j::{query_base_url, Neo4jConfig, Neo4jStore};

/// One result row: column name to value.
pub type Record = Map<String, Value>;

/// Named query parameters.
pub type Params = Map<String, Value>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{code}: {message}")]
    Query { code: String, message: String },
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Source of scoped sessions. Implementations pool connections internally.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, GraphError>;

    /// Short label for logs; must not contain credentials.
    fn label(&self) -> String;
}

/// A single-use context for running statements. Dropping it releases it.
#[async_trait]
pub trait GraphSession: Send {
    fn id(&self) -> &str;

    async fn run(&mut self, statement: &str, params: &Params) -> Result<Vec<Record>, GraphError>;

    async fn close(self: Box<Self>);
}
