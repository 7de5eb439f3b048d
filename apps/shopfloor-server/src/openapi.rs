use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::{OpenApi, ToSchema};

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct Banner {
    #[schema(example = "Shopfloor MCP Server running")]
    pub message: String,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct HealthOk {
    pub ok: bool,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct OperationList {
    #[schema(example = json!(["highVibrationMachines", "machineAlarms"]))]
    pub operations: Vec<String>,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct FieldDoc {
    #[serde(rename = "type")]
    #[schema(example = "number")]
    pub field_type: String,
    pub required: bool,
    #[schema(nullable, value_type = Option<Vec<String>>)]
    pub allowed: Option<Vec<String>>,
    #[schema(nullable, value_type = Option<String>)]
    pub description: Option<String>,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct OutputFieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct OperationDoc {
    pub name: String,
    #[schema(nullable, value_type = Option<String>)]
    pub description: Option<String>,
    pub inputs: std::collections::BTreeMap<String, FieldDoc>,
    pub outputs: Vec<OutputFieldDoc>,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct RunRequest {
    #[schema(example = "highVibrationMachines")]
    pub operation: String,
    #[schema(value_type = Object, example = json!({"threshold": "7.5", "unit": "mm/s"}))]
    pub inputs: Map<String, Value>,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct RunResponse {
    pub operation: String,
    #[schema(nullable, value_type = Option<String>)]
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub inputs_received: Map<String, Value>,
    #[schema(value_type = Vec<Object>)]
    pub outputs: Vec<Map<String, Value>>,
}

#[allow(dead_code)]
#[derive(Serialize, ToSchema)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Shopfloor MCP Server"),
    paths(
        crate::api::meta::root,
        crate::api::meta::healthz,
        crate::api::meta::openapi_json,
        crate::api::tools::list_operations,
        crate::api::tools::describe_operation,
        crate::api::tools::run_operation,
    ),
    components(schemas(
        Banner,
        HealthOk,
        OperationList,
        FieldDoc,
        OutputFieldDoc,
        OperationDoc,
        RunRequest,
        RunResponse,
        ProblemDetails,
    )),
    tags(
        (name = "Meta", description = "Service status"),
        (name = "Tools", description = "Operation catalog and execution")
    )
)]
pub struct ApiDoc;
