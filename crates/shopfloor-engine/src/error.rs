use shopfloor_contract::{UnknownOperation, ValidationError};
use shopfloor_graph::GraphError;

/// Backing store failure while running an operation. Carries the store's
/// message with the query template masked out.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("query for operation '{operation}' failed: {error}")]
pub struct ExecutionError {
    pub operation: String,
    pub error: GraphError,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error(transparent)]
    NotFound(#[from] UnknownOperation),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl RunError {
    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::NotFound(_) => "not_found",
            RunError::Validation(_) => "invalid",
            RunError::Execution(_) => "execution_failed",
        }
    }
}
