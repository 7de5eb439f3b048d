use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use shopfloor_contract::{ContractStore, OperationContract, RawInputs, ValidatedInputs, Validator};
use shopfloor_graph::{GraphStore, Record};
use tracing::{info, warn};

use crate::error::RunError;
use crate::executor::execute;
use crate::shaper::{shape, OperationSummary, ResponseEnvelope};
use crate::OperationRunner;

/// The validate → execute → shape pipeline over a shared, read-only contract.
#[derive(Clone)]
pub struct Engine {
    contracts: Arc<ContractStore>,
    validator: Validator,
    graph: Arc<dyn GraphStore>,
}

impl Engine {
    pub fn new(contracts: Arc<ContractStore>, graph: Arc<dyn GraphStore>) -> Self {
        Self {
            contracts,
            validator: Validator::default(),
            graph,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Look up and validate without touching the graph store.
    pub fn prepare(
        &self,
        name: &str,
        raw: &RawInputs,
    ) -> Result<(&OperationContract, ValidatedInputs), RunError> {
        let contract = self.contracts.lookup(name)?;
        let inputs = self.validator.validate(contract, raw)?;
        Ok((contract, inputs))
    }

    pub async fn execute_prepared(
        &self,
        contract: &OperationContract,
        inputs: &ValidatedInputs,
    ) -> Result<Vec<Record>, RunError> {
        Ok(execute(self.graph.as_ref(), contract, inputs).await?)
    }

    async fn run_inner(&self, name: &str, raw: &RawInputs) -> Result<ResponseEnvelope, RunError> {
        let (contract, inputs) = self.prepare(name, raw)?;
        let records = self.execute_prepared(contract, &inputs).await?;
        Ok(shape(contract, inputs, records))
    }
}

#[async_trait]
impl OperationRunner for Engine {
    fn list_operation_names(&self) -> Vec<String> {
        self.contracts.names()
    }

    fn describe(&self, name: &str) -> Result<OperationSummary, RunError> {
        Ok(OperationSummary::from(self.contracts.lookup(name)?))
    }

    async fn run(&self, name: &str, raw: &RawInputs) -> Result<ResponseEnvelope, RunError> {
        let started = Instant::now();
        let result = self.run_inner(name, raw).await;
        record_outcome(name, &result, started.elapsed(), false);
        result
    }
}

pub(crate) fn record_outcome(
    name: &str,
    result: &Result<ResponseEnvelope, RunError>,
    elapsed: Duration,
    cached: bool,
) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match result {
        Ok(envelope) => {
            info!(
                target: "engine",
                operation = %name,
                rows = envelope.outputs.len(),
                elapsed_ms,
                cached,
                "operation completed"
            );
            counter!(
                "shopfloor_operation_runs_total",
                "operation" => name.to_string(),
                "outcome" => "ok"
            )
            .increment(1);
            histogram!(
                "shopfloor_operation_duration_seconds",
                "operation" => name.to_string()
            )
            .record(elapsed.as_secs_f64());
        }
        Err(err) => {
            let operation = match err {
                RunError::NotFound(_) => "unknown".to_string(),
                _ => name.to_string(),
            };
            if matches!(err, RunError::Execution(_)) {
                warn!(target: "engine", operation = %name, elapsed_ms, "{err}");
            } else {
                info!(target: "engine", operation = %name, kind = err.kind(), "{err}");
            }
            counter!(
                "shopfloor_operation_runs_total",
                "operation" => operation,
                "outcome" => err.kind()
            )
            .increment(1);
        }
    }
}
