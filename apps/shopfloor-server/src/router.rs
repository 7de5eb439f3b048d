use axum::{
    routing::{get, post},
    Router,
};

use crate::{api, AppState};

pub(crate) mod paths {
    pub const ROOT: &str = "/";
    pub const HEALTHZ: &str = "/healthz";
    pub const OPENAPI: &str = "/openapi.json";
    pub const LIST_OPERATIONS: &str = "/tools/list_operations";
    pub const OPERATION: &str = "/tools/operations/{name}";
    pub const RUN: &str = "/tools/run";
}

pub(crate) fn build(state: AppState) -> Router<()> {
    Router::new()
        .route(paths::ROOT, get(api::meta::root))
        .route(paths::HEALTHZ, get(api::meta::healthz))
        .route(paths::OPENAPI, get(api::meta::openapi_json))
        .route(paths::LIST_OPERATIONS, get(api::tools::list_operations))
        .route(paths::OPERATION, get(api::tools::describe_operation))
        .route(paths::RUN, post(api::tools::run_operation))
        .with_state(state)
}
