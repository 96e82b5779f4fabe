use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::ApiError;

#[utoipa::path(
    get,
    path = "/api/v1/nodes",
    responses((status = 200, description = "Nodes served by this process"))
)]
pub(crate) async fn list_nodes(
    State(state): State<crate::ServerState>,
) -> Result<Response, ApiError> {
    let parties: Vec<_> = state.nodes().map(|n| n.identity().clone()).collect();
    Ok(Json(parties).into_response())
}

pub fn router() -> Router<crate::ServerState> {
    Router::new().route("/nodes", get(list_nodes))
}
