use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use iou_contract::{SignedTransaction, UniqueIdentifier};
use iou_flows::FlowError;
use iou_store::StateStatus;
use serde::Deserialize;
use serde_json::json;

use crate::api::ApiError;

#[derive(Deserialize, Debug)]
pub struct CreateIouRequest {
    pub value: i64,
    pub lender: UniqueIdentifier,
    pub borrower: UniqueIdentifier,
}

#[derive(Deserialize, Debug)]
pub struct AmendIouRequest {
    pub value: i64,
}

#[derive(Deserialize, Debug, Default)]
pub struct VaultQuery {
    #[serde(default)]
    pub status: StateStatus,
}

fn finalised(stx: &SignedTransaction) -> Json<serde_json::Value> {
    Json(json!({
        "txId": stx.id().to_string(),
        "linearId": stx.tx.outputs.first().map(|s| s.linear_id.to_string()),
        "value": stx.tx.outputs.first().map(|s| s.value),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes/{node}/ious",
    params(
        ("node" = String, Path, description = "Node name"),
        ("status" = Option<String>, Query, description = "unconsumed (default), consumed or all")
    ),
    responses((status = 200, description = "IOUs in the node's vault"))
)]
pub(crate) async fn list_ious(
    State(state): State<crate::ServerState>,
    Path(node): Path<String>,
    Query(query): Query<VaultQuery>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    Ok(Json(node.ious(query.status)?).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/nodes/{node}/ious",
    params(("node" = String, Path, description = "Node name")),
    responses(
        (status = 201, description = "IOU issued and recorded by every participant"),
        (status = 400, description = "Proposal violates the IOU contract"),
        (status = 504, description = "A counterparty did not respond")
    )
)]
pub(crate) async fn create_iou(
    State(state): State<crate::ServerState>,
    Path(node): Path<String>,
    Json(body): Json<CreateIouRequest>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    let stx = node
        .create_iou(body.value, &body.lender, &body.borrower)
        .await?;
    Ok((StatusCode::CREATED, finalised(&stx)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes/{node}/ious/{linear_id}",
    params(
        ("node" = String, Path, description = "Node name"),
        ("linear_id" = String, Path, description = "Linear id shared by every version of the IOU"),
        ("status" = Option<String>, Query, description = "unconsumed (default), consumed or all")
    ),
    responses(
        (status = 200, description = "Versions of the IOU"),
        (status = 404, description = "No version with the requested status")
    )
)]
pub(crate) async fn get_iou(
    State(state): State<crate::ServerState>,
    Path((node, linear_id)): Path<(String, UniqueIdentifier)>,
    Query(query): Query<VaultQuery>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    let versions = node.iou(&linear_id, query.status)?;
    if versions.is_empty() {
        return Err(FlowError::StateNotFound(linear_id).into());
    }
    Ok(Json(versions).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/nodes/{node}/ious/{linear_id}/amend",
    params(
        ("node" = String, Path, description = "Node hosting the borrower"),
        ("linear_id" = String, Path, description = "IOU to amend")
    ),
    responses(
        (status = 200, description = "Amendment recorded by every participant"),
        (status = 422, description = "The lender refused the new value")
    )
)]
pub(crate) async fn amend_iou(
    State(state): State<crate::ServerState>,
    Path((node, linear_id)): Path<(String, UniqueIdentifier)>,
    Json(body): Json<AmendIouRequest>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    let stx = node.update_iou(&linear_id, body.value).await?;
    Ok(finalised(&stx).into_response())
}

pub fn router() -> Router<crate::ServerState> {
    Router::new()
        .route("/", get(list_ious).post(create_iou))
        .route("/:linear_id", get(get_iou))
        .route("/:linear_id/amend", post(amend_iou))
}
