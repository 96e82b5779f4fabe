use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::ApiError;

#[utoipa::path(
    get,
    path = "/api/v1/nodes/{node}/acceptance",
    params(("node" = String, Path, description = "Node name")),
    responses((status = 200, description = "Predicates applied to proposed amendments"))
)]
pub(crate) async fn get_acceptance(
    State(state): State<crate::ServerState>,
    Path(node): Path<String>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    Ok(Json(node.policy()).into_response())
}

pub fn router() -> Router<crate::ServerState> {
    Router::new().route("/", get(get_acceptance))
}
