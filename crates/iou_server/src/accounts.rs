use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use iou_contract::UniqueIdentifier;
use iou_flows::FlowError;
use serde::Deserialize;

use crate::api::ApiError;

#[derive(Deserialize, Debug)]
pub struct CreateAccountRequest {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct ShareAccountRequest {
    /// Name of the node to share the account with.
    pub with: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/nodes/{node}/accounts",
    params(("node" = String, Path, description = "Node name")),
    responses((status = 200, description = "Accounts known to the node"))
)]
pub(crate) async fn list_accounts(
    State(state): State<crate::ServerState>,
    Path(node): Path<String>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    Ok(Json(node.accounts()?).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/nodes/{node}/accounts",
    params(("node" = String, Path, description = "Node name")),
    responses((status = 201, description = "Account created"))
)]
pub(crate) async fn create_account(
    State(state): State<crate::ServerState>,
    Path(node): Path<String>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    let account = node.create_account(&body.name)?;
    Ok((StatusCode::CREATED, Json(account)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/nodes/{node}/accounts/{id}/share",
    params(
        ("node" = String, Path, description = "Node name"),
        ("id" = String, Path, description = "Account identifier")
    ),
    responses((status = 204, description = "Account shared"))
)]
pub(crate) async fn share_account(
    State(state): State<crate::ServerState>,
    Path((node, id)): Path<(String, UniqueIdentifier)>,
    Json(body): Json<ShareAccountRequest>,
) -> Result<Response, ApiError> {
    let node = state.node(&node)?;
    let with = node
        .messaging()
        .party(&body.with)
        .ok_or(FlowError::UnknownParty(body.with))?;
    node.share_account_info(&id, &with).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub fn router() -> Router<crate::ServerState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/:id/share", post(share_account))
}
