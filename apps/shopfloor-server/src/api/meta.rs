use axum::{response::IntoResponse, Json};
use serde_json::json;
use utoipa::OpenApi;

/// Service banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "Meta",
    responses(
        (status = 200, description = "Server is running", body = crate::openapi::Banner)
    )
)]
pub async fn root() -> impl IntoResponse {
    Json(json!({"message": "Shopfloor MCP Server running"}))
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Meta",
    responses(
        (status = 200, description = "Service healthy", body = crate::openapi::HealthOk)
    )
)]
pub async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

/// Generated OpenAPI document for this server.
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "Meta",
    responses((status = 200, description = "OpenAPI document", body = serde_json::Value))
)]
pub async fn openapi_json() -> impl IntoResponse {
    Json(crate::openapi::ApiDoc::openapi())
}
