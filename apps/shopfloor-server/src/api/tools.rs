use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shopfloor_engine::CallRequest;

use crate::{responses, AppState};

/// Names of all operations in contract order.
#[utoipa::path(
    get,
    path = "/tools/list_operations",
    tag = "Tools",
    responses(
        (status = 200, description = "Operation names", body = crate::openapi::OperationList)
    )
)]
pub async fn list_operations(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({"operations": state.runner().list_operation_names()}))
}

/// Inputs and outputs of one operation. The query itself is not exposed.
#[utoipa::path(
    get,
    path = "/tools/operations/{name}",
    tag = "Tools",
    params(("name" = String, Path, description = "Operation name")),
    responses(
        (status = 200, description = "Operation summary", body = crate::openapi::OperationDoc),
        (status = 404, description = "Unknown operation", body = crate::openapi::ProblemDetails)
    )
)]
pub async fn describe_operation(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.runner().describe(&name) {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => responses::run_error(&err),
    }
}

/// Validate, execute and shape one operation call.
#[utoipa::path(
    post,
    path = "/tools/run",
    tag = "Tools",
    request_body = crate::openapi::RunRequest,
    responses(
        (status = 200, description = "Operation result", body = crate::openapi::RunResponse),
        (status = 400, description = "Invalid inputs or body", body = crate::openapi::ProblemDetails),
        (status = 404, description = "Unknown operation", body = crate::openapi::ProblemDetails),
        (status = 500, description = "Query failed", body = crate::openapi::ProblemDetails)
    )
)]
pub async fn run_operation(
    State(state): State<AppState>,
    payload: Result<Json<CallRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return responses::problem(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                rejection.body_text(),
            )
        }
    };
    match state.runner().call(&request).await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(err) => responses::run_error(&err),
    }
}
