use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::ApiError;

/// Flows that have not completed. Stalled flows stay listed until the
/// counterparty they were waiting on is dealt with.
#[utoipa::path(
    get,
    path = "/api/v1/nodes/{node}/flows",
    params(("node" = String, Path, description = "Node name")),
    responses((status = 200, description = "Checkpoints of unfinished flows"))
)]
pub(crate) async fn list_flows(
    State(state): State<crate::ServerState>,
    Path(node): Path<String>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    Ok(Json(node.checkpoints()?).into_response())
}

pub fn router() -> Router<crate::ServerState> {
    Router::new().route("/", get(list_flows))
}
