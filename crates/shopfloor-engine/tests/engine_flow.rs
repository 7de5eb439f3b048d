use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use shopfloor_contract::ContractStore;
use shopfloor_engine::{
    CacheSettings, CachedEngine, CallRequest, Engine, OperationRunner, RawInputs, RunError,
};
use shopfloor_graph::{GraphError, MemoryGraphStore, Record};

const VIBRATION_CYPHER: &str = "MATCH (m:Machine)-[:HAS_SENSOR]->(s)-[:RECORDED]->(r:Reading) WHERE r.value > $threshold AND r.unit = $unit RETURN m.id AS machineId, max(r.value) AS peakValue";

fn contracts() -> Arc<ContractStore> {
    let store = ContractStore::from_value(json!({
        "operations": {
            "highVibrationMachines": {
                "description": "Machines whose vibration exceeds a threshold",
                "inputs": {
                    "threshold": {"type": "number", "required": true},
                    "unit": {"type": "string", "required": true}
                },
                "outputs": [
                    {"name": "machineId", "type": "string"},
                    {"name": "peakValue", "type": "number"}
                ],
                "cypher": VIBRATION_CYPHER
            }
        }
    }))
    .expect("contract");
    Arc::new(store)
}

fn raw(value: Value) -> RawInputs {
    value.as_object().cloned().expect("object")
}

fn record(value: Value) -> Record {
    value.as_object().cloned().expect("object")
}

#[tokio::test]
async fn high_vibration_scenario_forwards_exactly_the_validated_params() {
    let graph = MemoryGraphStore::with_rows(vec![record(
        json!({"machineId": "M-104", "peakValue": 9.2}),
    )]);
    let engine = Engine::new(contracts(), Arc::new(graph.clone()));

    let envelope = engine
        .run(
            "highVibrationMachines",
            &raw(json!({"threshold": "7.5", "unit": "mm/s"})),
        )
        .await
        .expect("run");

    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({
            "operation": "highVibrationMachines",
            "description": "Machines whose vibration exceeds a threshold",
            "inputs_received": {"threshold": 7.5, "unit": "mm/s"},
            "outputs": [{"machineId": "M-104", "peakValue": 9.2}]
        })
    );

    let calls = graph.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].statement, VIBRATION_CYPHER);
    assert_eq!(calls[0].params, raw(json!({"threshold": 7.5, "unit": "mm/s"})));
    assert_eq!(graph.open_sessions(), 0);
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let graph = MemoryGraphStore::failing(GraphError::Connection("unused".into()));
    let engine = Engine::new(contracts(), Arc::new(graph.clone()));
    let err = engine.run("noSuchOp", &RawInputs::new()).await.unwrap_err();
    assert!(matches!(err, RunError::NotFound(_)), "{err:?}");
    assert_eq!(graph.sessions_opened(), 0);
}

#[tokio::test]
async fn missing_required_input_names_the_field() {
    let graph = MemoryGraphStore::with_rows(Vec::new());
    let engine = Engine::new(contracts(), Arc::new(graph.clone()));
    let err = engine
        .run("highVibrationMachines", &raw(json!({"unit": "mm/s"})))
        .await
        .unwrap_err();
    match err {
        RunError::Validation(inner) => assert_eq!(inner.field(), Some("threshold")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(graph.calls().is_empty());
}

#[tokio::test]
async fn store_failure_is_an_execution_error_without_the_template() {
    let graph = MemoryGraphStore::failing(GraphError::Query {
        code: "Neo.ClientError.Statement.SyntaxError".into(),
        message: format!("Invalid input 'max': expected an expression\n\"{VIBRATION_CYPHER}\""),
    });
    let engine = Engine::new(contracts(), Arc::new(graph.clone()));
    let err = engine
        .run(
            "highVibrationMachines",
            &raw(json!({"threshold": 1, "unit": "dB"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Execution(_)));
    let message = err.to_string();
    assert!(message.contains("Invalid input 'max'"));
    assert!(!message.contains(VIBRATION_CYPHER));
    assert!(!message.contains("$threshold"));
    assert_eq!(message.matches("Invalid input").count(), 1);
    assert_eq!(graph.open_sessions(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_runs_use_distinct_sessions() {
    let graph = MemoryGraphStore::with_rows(Vec::new());
    graph.set_latency(Duration::from_millis(50));
    let engine = Arc::new(Engine::new(contracts(), Arc::new(graph.clone())));

    let mut handles = Vec::new();
    for threshold in ["1", "2", "3", "4"] {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .run(
                    "highVibrationMachines",
                    &raw(json!({"threshold": threshold, "unit": "C"})),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("run");
    }

    let sessions: HashSet<String> = graph.calls().into_iter().map(|c| c.session_id).collect();
    assert_eq!(sessions.len(), 4);
    assert!(graph.peak_open_sessions() >= 2);
    assert_eq!(graph.open_sessions(), 0);
}

#[tokio::test]
async fn call_request_deserializes_with_default_inputs() {
    let graph = MemoryGraphStore::with_rows(Vec::new());
    let engine = Engine::new(contracts(), Arc::new(graph));
    let request: CallRequest = serde_json::from_value(json!({"operation": "noSuchOp"})).unwrap();
    assert!(request.inputs.is_empty());
    assert!(matches!(
        engine.call(&request).await,
        Err(RunError::NotFound(_))
    ));
}

#[tokio::test]
async fn cached_engine_skips_execution_on_repeat_calls() {
    let graph = MemoryGraphStore::with_rows(vec![record(json!({"machineId": "M-1"}))]);
    let engine = Engine::new(contracts(), Arc::new(graph.clone()));
    let cached = CachedEngine::new(engine, CacheSettings::default());

    let first = cached
        .run(
            "highVibrationMachines",
            &raw(json!({"threshold": "7.5", "unit": "mm/s"})),
        )
        .await
        .unwrap();
    let second = cached
        .run(
            "highVibrationMachines",
            &raw(json!({"threshold": 7.5, "unit": "mm/s", "note": "ignored"})),
        )
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(graph.sessions_opened(), 1);

    let err = cached
        .run("highVibrationMachines", &raw(json!({"threshold": 7.5})))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Validation(_)));

    cached
        .run(
            "highVibrationMachines",
            &raw(json!({"threshold": 8, "unit": "mm/s"})),
        )
        .await
        .unwrap();
    assert_eq!(graph.sessions_opened(), 2);
    assert_eq!(cached.list_operation_names(), vec!["highVibrationMachines"]);
}

#[tokio::test]
async fn cached_engine_does_not_cache_failures() {
    let graph = MemoryGraphStore::failing(GraphError::Connection("refused".into()));
    let cached = CachedEngine::new(
        Engine::new(contracts(), Arc::new(graph.clone())),
        CacheSettings::default(),
    );
    let inputs = raw(json!({"threshold": 1, "unit": "C"}));
    assert!(cached.run("highVibrationMachines", &inputs).await.is_err());
    assert!(cached.run("highVibrationMachines", &inputs).await.is_err());
    assert_eq!(graph.sessions_opened(), 2);
}
