use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(
    crate::nodes::list_nodes,
    crate::accounts::list_accounts,
    crate::accounts::create_account,
    crate::accounts::share_account,
    crate::ious::list_ious,
    crate::ious::create_iou,
    crate::ious::get_iou,
    crate::ious::amend_iou,
    crate::flows::list_flows,
    crate::acceptance::get_acceptance,
))]
pub struct OpenApiDoc;

async fn openapi_json() -> Response {
    Json(OpenApiDoc::openapi()).into_response()
}

pub fn router() -> Router<crate::ServerState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}
