use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use shopfloor_engine::RunError;

/// RFC 7807 style error body.
pub fn problem(status: StatusCode, title: &str, detail: impl Into<String>) -> Response {
    problem_with(status, title, detail, None)
}

fn problem_with(
    status: StatusCode,
    title: &str,
    detail: impl Into<String>,
    extra: Option<(&str, Value)>,
) -> Response {
    let mut body = json!({
        "type": "about:blank",
        "title": title,
        "status": status.as_u16(),
        "detail": detail.into(),
    });
    if let (Some((key, value)), Value::Object(map)) = (extra, &mut body) {
        map.insert(key.to_string(), value);
    }
    (status, Json(body)).into_response()
}

/// Map an engine failure onto 404, 400 or 500.
pub fn run_error(err: &RunError) -> Response {
    match err {
        RunError::NotFound(_) => problem(StatusCode::NOT_FOUND, "Not Found", err.to_string()),
        RunError::Validation(inner) => problem_with(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            err.to_string(),
            inner.field().map(|field| ("field", Value::String(field.to_string()))),
        ),
        RunError::Execution(_) => problem(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Query Failed",
            err.to_string(),
        ),
    }
}
