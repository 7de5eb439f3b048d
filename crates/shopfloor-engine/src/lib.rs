//! Operation contract execution engine.
//!
//! `run(name, raw)` looks the operation up, validates and casts the raw
//! inputs, executes the query template in a fresh graph session and shapes
//! the response envelope.

mod cache;
mod engine;
mod error;
mod executor;
mod shaper;

use async_trait::async_trait;
use serde::Deserialize;

pub use cache::{fingerprint, CacheSettings, CachedEngine};
pub use engine::Engine;
pub use error::{ExecutionError, RunError};
pub use executor::execute;
pub use shaper::{shape, OperationSummary, ResponseEnvelope};
pub use shopfloor_contract::RawInputs;

/// One invocation as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CallRequest {
    pub operation: String,
    #[serde(default)]
    pub inputs: RawInputs,
}

/// What a transport layer needs from the engine.
#[async_trait]
pub trait OperationRunner: Send + Sync {
    fn list_operation_names(&self) -> Vec<String>;

    fn describe(&self, name: &str) -> Result<OperationSummary, RunError>;

    async fn run(&self, name: &str, raw: &RawInputs) -> Result<ResponseEnvelope, RunError>;

    async fn call(&self, request: &CallRequest) -> Result<ResponseEnvelope, RunError> {
        self.run(&request.operation, &request.inputs).await
    }
}
