use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::Json;

use super::response::{ApiError, ApiResponse};
use super::tracing::RequestContext;
use crate::registry::{DiscoverRequest, NodeRequest, Registry};

/// POST /register and POST /heartbeat.
pub async fn register_handler(
    State(registry): State<Registry>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<NodeRequest>, JsonRejection>,
) -> ApiResponse {
    let response = match body {
        Ok(Json(request)) => ApiResponse::from_result(registry.register_or_renew(&request).await),
        Err(rejection) => ApiResponse::error(ApiError::validation(rejection.body_text())),
    };
    response.with_request_id(ctx.request_id)
}

/// GET /discover/{service}.
pub async fn discover_path_handler(
    State(registry): State<Registry>,
    Extension(ctx): Extension<RequestContext>,
    Path(service): Path<String>,
) -> ApiResponse {
    let request = DiscoverRequest::new(service);
    ApiResponse::from_result(registry.discover(&request).await).with_request_id(ctx.request_id)
}

/// GET /discover?service=...
pub async fn discover_query_handler(
    State(registry): State<Registry>,
    Extension(ctx): Extension<RequestContext>,
    query: Result<Query<DiscoverRequest>, QueryRejection>,
) -> ApiResponse {
    let response = match query {
        Ok(Query(request)) => ApiResponse::from_result(registry.discover(&request).await),
        Err(rejection) => ApiResponse::error(ApiError::validation(rejection.body_text())),
    };
    response.with_request_id(ctx.request_id)
}

/// DELETE /unregister.
pub async fn unregister_handler(
    State(registry): State<Registry>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<NodeRequest>, JsonRejection>,
) -> ApiResponse {
    let response = match body {
        Ok(Json(request)) => ApiResponse::from_result(registry.unregister(&request).await),
        Err(rejection) => ApiResponse::error(ApiError::validation(rejection.body_text())),
    };
    response.with_request_id(ctx.request_id)
}

/// GET /health. Triggers a full sweep.
pub async fn health_handler(
    State(registry): State<Registry>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResponse {
    ApiResponse::from_result(registry.health().await).with_request_id(ctx.request_id)
}
