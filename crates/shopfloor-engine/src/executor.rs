use shopfloor_contract::{OperationContract, ValidatedInputs};
use shopfloor_graph::{GraphError, GraphStore, Record};
use tracing::debug;

use crate::error::ExecutionError;

/// Run `contract`'s query template in a fresh session with `inputs` bound as
/// named parameters.
///
/// The session is closed on success and on failure; if the returned future is
/// dropped early the session is released when it goes out of scope.
pub async fn execute(
    graph: &dyn GraphStore,
    contract: &OperationContract,
    inputs: &ValidatedInputs,
) -> Result<Vec<Record>, ExecutionError> {
    let wrap = |error| ExecutionError {
        operation: contract.name.clone(),
        error: mask_template(error, &contract.query_template),
    };
    let mut session = graph.open_session().await.map_err(wrap)?;
    debug!(
        operation = %contract.name,
        session = %session.id(),
        params = ?inputs.keys().collect::<Vec<_>>(),
        "executing operation"
    );
    let outcome = session
        .run(&contract.query_template, inputs.as_map())
        .await;
    session.close().await;
    outcome.map_err(wrap)
}

const MASK: &str = "<query>";
/// Template lines shorter than this are too generic to mask on their own.
const MIN_MASKED_LINE: usize = 12;

/// Stores such as Neo4j quote the failing statement in syntax errors; keep
/// the message but replace the template text.
fn mask_template(error: GraphError, template: &str) -> GraphError {
    let mask = |text: String| mask_text(text, template);
    match error {
        GraphError::Query { code, message } => GraphError::Query {
            code,
            message: mask(message),
        },
        GraphError::Connection(text) => GraphError::Connection(mask(text)),
        GraphError::Protocol(text) => GraphError::Protocol(mask(text)),
        GraphError::Config(text) => GraphError::Config(mask(text)),
    }
}

fn mask_text(mut text: String, template: &str) -> String {
    let whole = template.trim();
    if !whole.is_empty() && text.contains(whole) {
        text = text.replace(whole, MASK);
    }
    for line in template.lines().map(str::trim) {
        if line.len() >= MIN_MASKED_LINE && text.contains(line) {
            text = text.replace(line, MASK);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopfloor_contract::{validate, ContractStore};
    use shopfloor_graph::{GraphError, MemoryGraphStore};

    fn contract() -> OperationContract {
        let store = ContractStore::from_value(json!({
            "operations": {
                "machineAlarms": {
                    "inputs": {"machineId": {"type": "string", "required": true}},
                    "cypher": "MATCH (m:Machine {id: $machineId})-[:RAISED]->(a:Alarm) RETURN a.id AS alarmId"
                }
            }
        }))
        .unwrap();
        store.lookup("machineAlarms").unwrap().clone()
    }

    #[tokio::test]
    async fn binds_validated_inputs_as_parameters() {
        let graph = MemoryGraphStore::with_rows(vec![json!({"alarmId": "A-1"})
            .as_object()
            .cloned()
            .unwrap()]);
        let contract = contract();
        let inputs = validate(&contract, json!({"machineId": 104}).as_object().unwrap()).unwrap();

        let rows = execute(&graph, &contract, &inputs).await.unwrap();
        assert_eq!(rows.len(), 1);

        let calls = graph.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].statement, contract.query_template);
        assert_eq!(calls[0].params, *json!({"machineId": "104"}).as_object().unwrap());
        assert_eq!(graph.open_sessions(), 0);
    }

    #[tokio::test]
    async fn store_messages_quoting_the_template_are_masked() {
        let contract = contract();
        let graph = MemoryGraphStore::failing(GraphError::Query {
            code: "Neo.ClientError.Statement.SyntaxError".into(),
            message: format!(
                "Invalid input 'RAISED': expected a relationship type (line 1, column 30)\n\"{}\"",
                contract.query_template
            ),
        });
        let inputs = validate(&contract, json!({"machineId": "M-1"}).as_object().unwrap()).unwrap();

        let err = execute(&graph, &contract, &inputs).await.unwrap_err();
        let message = err.to_string();
        assert!(!message.contains(&contract.query_template), "{message}");
        assert!(message.contains("Invalid input 'RAISED'"));
        assert!(message.contains("\"<query>\""));
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn multi_line_templates_are_masked_line_by_line() {
        let template = "MATCH (z:Zone {id: $zone})\nRETURN z.id AS zone\nLIMIT 5";
        let masked = mask_text(
            "Variable not defined (line 2)\n\"RETURN z.id AS zone\"\n       ^".to_string(),
            template,
        );
        assert_eq!(masked, "Variable not defined (line 2)\n\"<query>\"\n       ^");
        assert_eq!(mask_text("LIMIT 5 exceeded".to_string(), template), "LIMIT 5 exceeded");
    }

    #[tokio::test]
    async fn failures_release_the_session_and_name_the_operation() {
        let graph = MemoryGraphStore::failing(GraphError::Query {
            code: "Neo.ClientError.Schema.ConstraintValidationFailed".into(),
            message: "already exists".into(),
        });
        let contract = contract();
        let inputs = validate(&contract, json!({"machineId": "M-1"}).as_object().unwrap()).unwrap();

        let err = execute(&graph, &contract, &inputs).await.unwrap_err();
        assert_eq!(err.operation, "machineAlarms");
        assert!(err.to_string().contains("already exists"));
        assert!(!err.to_string().contains("MATCH"));
        assert_eq!(graph.open_sessions(), 0);
    }
}
