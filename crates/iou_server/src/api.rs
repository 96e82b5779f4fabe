use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use iou_flows::{FlowError, NotaryError};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

trait AsStatusCode {
    fn as_status_code(&self) -> StatusCode;
}

impl AsStatusCode for NotaryError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            NotaryError::Conflict { .. } => StatusCode::CONFLICT,
            NotaryError::WrongNotary(_) | NotaryError::Transaction(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl AsStatusCode for FlowError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            FlowError::Contract(_) | FlowError::Transaction(_) => StatusCode::BAD_REQUEST,
            FlowError::NotHostedLocally(_) => StatusCode::BAD_REQUEST,
            FlowError::Refused { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FlowError::AccountNotFound(_)
            | FlowError::StateNotFound(_)
            | FlowError::UnknownParty(_) => StatusCode::NOT_FOUND,
            FlowError::AmbiguousState { .. } => StatusCode::CONFLICT,
            FlowError::Notary(e) => e.as_status_code(),
            FlowError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            FlowError::Store(_) | FlowError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, msg) = match &self {
            ApiError::NodeNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Flow(e) => (e.as_status_code(), e.reason()),
        };
        if status_code.is_server_error() {
            warn!(error = %self, "request failed");
        }
        let mut body = json!({
            "error": {
                "detail": msg,
            }
        });
        if let ApiError::Flow(e) = &self {
            body["error"]["retryable"] = e.is_retryable().into();
        }

        (status_code, Json(body)).into_response()
    }
}

pub fn router() -> Router<crate::ServerState> {
    let node_v1 = Router::new()
        .nest("/accounts", crate::accounts::router())
        .nest("/ious", crate::ious::router())
        .nest("/flows", crate::flows::router())
        .nest("/acceptance", crate::acceptance::router());

    let router_v1 = Router::new()
        .merge(crate::nodes::router())
        .nest("/nodes/:node", node_v1);

    Router::new().nest("/v1", router_v1)
}
