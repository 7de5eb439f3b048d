use serde::Serialize;
use shopfloor_contract::{InputSchema, OperationContract, OutputField, ValidatedInputs};
use shopfloor_graph::Record;

/// Response for a successful call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub operation: String,
    pub description: Option<String>,
    pub inputs_received: ValidatedInputs,
    pub outputs: Vec<Record>,
}

pub fn shape(
    contract: &OperationContract,
    inputs: ValidatedInputs,
    records: Vec<Record>,
) -> ResponseEnvelope {
    ResponseEnvelope {
        operation: contract.name.clone(),
        description: contract.description.clone(),
        inputs_received: inputs,
        outputs: records,
    }
}

/// Public description of an operation. The query template is deliberately
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub name: String,
    pub description: Option<String>,
    pub inputs: InputSchema,
    pub outputs: Vec<OutputField>,
}

impl From<&OperationContract> for OperationSummary {
    fn from(contract: &OperationContract) -> Self {
        Self {
            name: contract.name.clone(),
            description: contract.description.clone(),
            inputs: contract.input_schema.clone(),
            outputs: contract.output_schema.clone(),
        }
    }
}
